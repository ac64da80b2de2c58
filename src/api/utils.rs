//! API utility functions
//!
//! Shared router state plus input validation helpers used by the handlers.
//! Validation happens here, before any request reaches the store or the
//! generation service.

use crate::agent::SessionRegistry;
use crate::error::AppError;
use crate::gemini::GeminiClient;
use crate::store::MessageStore;
use std::sync::Arc;

/// Maximum question length in characters
pub const MAX_QUESTION_LENGTH: usize = 10_000; // 10KB max question length

/// Minimum handle length accepted at registration
pub const MIN_HANDLE_LENGTH: usize = 3;

/// Minimum secret length accepted at registration
pub const MIN_SECRET_LENGTH: usize = 6;

/// Shared application state handed to every handler
pub struct AppState {
    /// Message store (users and pairwise messages)
    pub store: MessageStore,
    /// Live chat sessions
    pub sessions: SessionRegistry,
    /// Remote generation client
    pub gemini: GeminiClient,
}

/// Router state type used by all handlers
pub type RouterState = Arc<AppState>;

/// Validate registration input
///
/// Rejects locally, before the store is reached: the handle must be at
/// least 3 characters and the secret at least 6.
pub fn validate_registration(handle: &str, secret: &str) -> Result<(), AppError> {
    if handle.len() < MIN_HANDLE_LENGTH {
        return Err(AppError::Validation(format!(
            "Handle must be at least {} characters",
            MIN_HANDLE_LENGTH
        )));
    }
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(AppError::Validation(format!(
            "Secret must be at least {} characters",
            MIN_SECRET_LENGTH
        )));
    }
    Ok(())
}

/// Validate a chat question
pub fn validate_question(question: &str) -> Result<(), AppError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }
    if trimmed.len() > MAX_QUESTION_LENGTH {
        return Err(AppError::Validation(format!(
            "Question exceeds maximum length of {} characters",
            MAX_QUESTION_LENGTH
        )));
    }
    Ok(())
}

/// Validate a message body
pub fn validate_message_body(body: &str) -> Result<(), AppError> {
    if body.trim().is_empty() {
        return Err(AppError::Validation(
            "Message body cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_registration_limits() {
        assert!(validate_registration("amy", "secret").is_ok());
        assert!(validate_registration("ab", "secret").is_err());
        assert!(validate_registration("amy", "12345").is_err());
    }

    #[test]
    fn test_validate_question() {
        assert!(validate_question("how many rows?").is_ok());
        assert!(validate_question("   ").is_err());
        assert!(validate_question(&"x".repeat(MAX_QUESTION_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_message_body() {
        assert!(validate_message_body("hi").is_ok());
        assert!(validate_message_body(" ").is_err());
    }
}
