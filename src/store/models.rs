//! Message store data models
//!
//! Defines structures for users, contacts, and conversation entries.

use serde::Serialize;
use sqlx::FromRow;

/// A registered user
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    /// Unique identifier, assigned by the store
    pub id: i64,
    /// Public unique username
    pub handle: String,
    /// One-way digest of the user's secret (never the plaintext)
    #[serde(skip_serializing)]
    pub credential_hash: String,
    /// When the user registered (Unix timestamp)
    pub created_at: i64,
    /// When the user was last active (Unix timestamp)
    ///
    /// Present in the schema but not written by any current operation.
    pub last_active_at: Option<i64>,
}

/// A contact list entry: user id plus handle
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Contact {
    /// User identifier
    pub id: i64,
    /// Public unique username
    pub handle: String,
}

/// One entry of a pairwise conversation, with the sender resolved to a handle
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConversationEntry {
    /// Message text
    pub body: String,
    /// When the message was inserted (Unix timestamp)
    pub created_at: i64,
    /// Handle of the sending user
    pub sender_handle: String,
    /// Id of the sending user
    pub sender_id: i64,
}
