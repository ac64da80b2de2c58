//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. The only hard requirement is the generation API
//! key: startup fails fast when it is absent.

use anyhow::anyhow;
use std::env;

/// Default model used for generation requests
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default base URL of the generation API
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Message store configuration
    pub store: StoreConfig,
    /// Remote generation configuration
    pub generation: GenerationConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Message store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

/// Remote generation configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// API key for the generation service (required)
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Base URL of the generation API
    pub api_base_url: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    /// Returns an error when `GEMINI_API_KEY` is not set. This is the one
    /// fatal configuration error: without a key every chat interaction
    /// would fail, so the process refuses to start.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY must be set"))?;

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            store: StoreConfig {
                database_path: env::var("DATABASE_PATH")
                    .unwrap_or_else(|_| "data/datachat.db".to_string()),
            },
            generation: GenerationConfig {
                api_key,
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
                api_base_url: env::var("GEMINI_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            },
        })
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
