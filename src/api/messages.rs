//! Message API endpoints
//!
//! Sending pairwise messages and reading a two-user conversation.

use crate::api::utils::{validate_message_body, RouterState};
use crate::error::AppError;
use crate::store::ConversationEntry;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;

/// Request to send a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Sending user's id
    pub sender_id: i64,
    /// Receiving user's id
    pub recipient_id: i64,
    /// Message text (must be non-empty)
    pub body: String,
}

/// Query parameters identifying a pairwise conversation
#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    /// One participant
    pub user_a: i64,
    /// The other participant
    pub user_b: i64,
}

/// POST /api/messages - Store one message
pub async fn send_message(
    State(state): State<RouterState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    validate_message_body(&request.body)?;

    state
        .store
        .send_message(request.sender_id, request.recipient_id, &request.body)
        .await?;

    debug!(
        sender_id = request.sender_id,
        recipient_id = request.recipient_id,
        "Message sent"
    );

    Ok(Json(serde_json::json!({
        "message": "Message sent"
    })))
}

/// GET /api/messages/conversation - Messages between two users, oldest first
///
/// The parameters are symmetric: swapping `user_a` and `user_b` returns the
/// same sequence.
pub async fn conversation(
    State(state): State<RouterState>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<Vec<ConversationEntry>>, AppError> {
    let entries = state
        .store
        .conversation_between(query.user_a, query.user_b)
        .await?;
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SessionRegistry;
    use crate::api::utils::AppState;
    use crate::gemini::GeminiClient;
    use crate::store::MessageStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_router_state() -> (RouterState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let store = MessageStore::new(db_path.to_str().unwrap())
            .await
            .expect("Failed to create test database");
        let state = Arc::new(AppState {
            store,
            sessions: SessionRegistry::new(),
            gemini: GeminiClient::with_base_url("test-key", "test-model", "http://localhost:1"),
        });
        (state, temp_dir)
    }

    #[tokio::test]
    async fn test_send_message_empty_body_rejected() {
        let (state, _temp_dir) = create_test_router_state().await;
        let result = send_message(
            State(state),
            Json(SendMessageRequest {
                sender_id: 1,
                recipient_id: 2,
                body: "   ".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_conversation_round_trip() {
        let (state, _temp_dir) = create_test_router_state().await;
        state.store.register("amy", "secret1").await.unwrap();
        state.store.register("bob", "secret2").await.unwrap();
        let amy = state.store.authenticate("amy", "secret1").await.unwrap().unwrap();
        let bob = state.store.authenticate("bob", "secret2").await.unwrap().unwrap();

        send_message(
            State(state.clone()),
            Json(SendMessageRequest {
                sender_id: amy.id,
                recipient_id: bob.id,
                body: "hello".to_string(),
            }),
        )
        .await
        .unwrap();

        let result = conversation(
            State(state),
            Query(ConversationQuery {
                user_a: bob.id,
                user_b: amy.id,
            }),
        )
        .await
        .unwrap();

        assert_eq!(result.0.len(), 1);
        assert_eq!(result.0[0].body, "hello");
        assert_eq!(result.0[0].sender_handle, "amy");
    }
}
