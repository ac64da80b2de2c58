//! Message store database operations
//!
//! Handles all database interactions for users and their pairwise messages.

use crate::error::AppError;
use crate::store::models::{Contact, ConversationEntry, User};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Database connection pool for the message store
#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Initialize database connection pool and run schema migrations
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(MessageStore)` if successful
    /// * `Err(AppError)` if connection or migration failed
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        // Ensure parent directory exists
        if let Some(parent) = PathBuf::from(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Failed to create db directory: {}", e))
                })?;
            }
        }

        // SQLite connection string format: sqlite://path/to/db.db
        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to connect to database: {}", e))
            })?;

        info!("Connected to SQLite database at: {}", db_path);

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations
    ///
    /// Idempotent: every statement is guarded with IF NOT EXISTS, so this is
    /// safe to call on every process start regardless of prior state.
    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../../migrations/001_create_store.sql");

        // Remove comments (lines starting with --) and normalize whitespace
        let mut cleaned_sql = String::new();
        for line in migration_sql.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            // Remove inline comments (everything after --)
            let without_comments = if let Some(comment_pos) = trimmed.find("--") {
                &trimmed[..comment_pos]
            } else {
                trimmed
            };
            cleaned_sql.push_str(without_comments.trim());
            cleaned_sql.push(' ');
        }

        // Split by semicolon and filter out empty statements
        let statements: Vec<&str> = cleaned_sql
            .split(';')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::Internal(anyhow::anyhow!(
                        "Migration failed: {} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Register a new user
    ///
    /// Returns `Ok(false)` when the handle is already taken; the UNIQUE
    /// violation is converted to a boolean and never surfaces as an error.
    /// Input length validation happens at the API layer, before the store
    /// is reached.
    pub async fn register(&self, handle: &str, secret: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (handle, credential_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(handle)
        .bind(digest(secret))
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(handle = %handle, "Registered user");
                Ok(true)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!(handle = %handle, "Registration rejected, handle taken");
                Ok(false)
            }
            Err(e) => Err(AppError::Internal(anyhow::anyhow!(
                "Failed to register user: {}",
                e
            ))),
        }
    }

    /// Authenticate a user by handle and secret
    ///
    /// Matches the handle and the secret's digest jointly in one query, so a
    /// wrong handle and a wrong secret are indistinguishable to the caller.
    pub async fn authenticate(
        &self,
        handle: &str,
        secret: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, handle, credential_hash, created_at, last_active_at FROM users WHERE handle = ? AND credential_hash = ?",
        )
        .bind(handle)
        .bind(digest(secret))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to authenticate user: {}", e)))?;

        Ok(user)
    }

    /// List all users as (id, handle) pairs, alphabetical by handle
    ///
    /// # Arguments
    /// * `excluding` - Optional user id to leave out (typically the caller)
    pub async fn list_contacts(&self, excluding: Option<i64>) -> Result<Vec<Contact>, AppError> {
        let contacts = match excluding {
            Some(id) => {
                sqlx::query_as::<_, Contact>(
                    "SELECT id, handle FROM users WHERE id != ? ORDER BY handle ASC",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Contact>("SELECT id, handle FROM users ORDER BY handle ASC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to list contacts: {}", e)))?;

        Ok(contacts)
    }

    /// Insert one message with a server-assigned timestamp
    ///
    /// Recipient existence is not checked; a dangling reference is possible.
    pub async fn send_message(
        &self,
        sender_id: i64,
        recipient_id: i64,
        body: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO messages (sender_id, recipient_id, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(body)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to send message: {}", e)))?;

        debug!(sender_id, recipient_id, "Stored message");
        Ok(())
    }

    /// Get the conversation between two users, in either direction
    ///
    /// Ordered by timestamp ascending with ties broken by insertion order
    /// (the auto-increment id). Resolves sender handles with a single JOIN
    /// against the users table.
    pub async fn conversation_between(
        &self,
        user_a: i64,
        user_b: i64,
    ) -> Result<Vec<ConversationEntry>, AppError> {
        let entries = sqlx::query_as::<_, ConversationEntry>(
            "SELECT m.body, m.created_at, u.handle AS sender_handle, m.sender_id \
             FROM messages m \
             JOIN users u ON u.id = m.sender_id \
             WHERE (m.sender_id = ?1 AND m.recipient_id = ?2) \
                OR (m.sender_id = ?2 AND m.recipient_id = ?1) \
             ORDER BY m.created_at ASC, m.id ASC",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to fetch conversation: {}", e)))?;

        Ok(entries)
    }

    /// Count registered users
    #[allow(dead_code)] // Used by integration tests
    pub async fn user_count(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to count users: {}", e)))?;

        Ok(count)
    }

    /// Get the database pool (for advanced operations if needed)
    #[allow(dead_code)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// One-way digest of a credential, stored instead of the plaintext
fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
