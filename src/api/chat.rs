//! Chat API endpoints
//!
//! Session creation, dataset upload, and question answering for the
//! data-chat agent.

use crate::agent::dataset::Dataset;
use crate::agent::PromptMode;
use crate::api::utils::{validate_question, RouterState};
use crate::error::AppError;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Request to create a chat session
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// How the dataset is exposed to the model; defaults to inline
    #[serde(default)]
    pub mode: PromptMode,
}

/// Newly created session
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    /// Identifier to use for uploads and questions
    pub session_id: String,
    /// The session's prompt mode
    pub mode: PromptMode,
}

/// Summary of an uploaded dataset
#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    /// Number of data rows
    pub rows: usize,
    /// Column names, in file order
    pub columns: Vec<String>,
    /// The first rows, for display
    pub preview: Vec<Vec<String>>,
}

/// Request to ask a question about the session's dataset
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// The user's question
    pub question: String,
}

/// Answer to a question
#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// Final natural-language reply
    pub answer: String,
    /// The session the answer belongs to
    pub session_id: String,
}

/// POST /api/sessions - Create a new chat session
pub async fn create_session(
    State(state): State<RouterState>,
    request: Option<Json<CreateSessionRequest>>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let mode = request.map(|Json(r)| r.mode).unwrap_or_default();
    let session_id = state.sessions.create(mode).await;

    Ok(Json(CreateSessionResponse { session_id, mode }))
}

/// POST /api/sessions/:id/dataset - Upload a CSV dataset into a session
///
/// Accepts multipart form data with a `file` field holding the CSV bytes.
/// The session is created on first use if it does not exist yet; an upload
/// into an existing session replaces its snapshot but keeps its history.
pub async fn upload_dataset(
    State(state): State<RouterState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<DatasetSummary>, AppError> {
    let mut csv_text: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::Validation(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("");

        match field_name {
            "file" => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read file field: {}", e))
                })?;
                csv_text = Some(text);
            }
            _ => {
                warn!("Unknown multipart field: {}", field_name);
            }
        }
    }

    let csv_text =
        csv_text.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    let dataset = Dataset::parse(&csv_text)?;

    info!(
        session_id = %session_id,
        rows = dataset.row_count(),
        columns = dataset.columns().len(),
        "Dataset uploaded"
    );

    let summary = DatasetSummary {
        rows: dataset.row_count(),
        columns: dataset.columns().to_vec(),
        preview: dataset.preview().to_vec(),
    };

    let session = state
        .sessions
        .get_or_create(&session_id, PromptMode::default())
        .await;
    session.lock().await.set_dataset(dataset);

    Ok(Json(summary))
}

/// POST /api/sessions/:id/ask - Ask one question about the loaded dataset
pub async fn ask(
    State(state): State<RouterState>,
    Path(session_id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    validate_question(&request.question)?;

    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    info!(
        session_id = %session_id,
        question_len = request.question.len(),
        "Chat question received"
    );

    let answer = session
        .lock()
        .await
        .ask(&request.question, &state.gemini)
        .await?;

    Ok(Json(AskResponse { answer, session_id }))
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
    async fn test_create_session_default_mode() {
        let (state, _temp_dir) = create_test_router_state().await;
        let result = create_session(State(state), None).await.unwrap();
        assert_eq!(result.0.mode, PromptMode::Inline);
        assert!(!result.0.session_id.is_empty());
    }

    #[tokio::test]
    async fn test_create_session_tool_mode() {
        let (state, _temp_dir) = create_test_router_state().await;
        let result = create_session(
            State(state),
            Some(Json(CreateSessionRequest {
                mode: PromptMode::Tool,
            })),
        )
        .await
        .unwrap();
        assert_eq!(result.0.mode, PromptMode::Tool);
    }

    #[tokio::test]
    async fn test_ask_unknown_session() {
        let (state, _temp_dir) = create_test_router_state().await;
        let result = ask(
            State(state),
            Path("nonexistent".to_string()),
            Json(AskRequest {
                question: "how many rows?".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_ask_empty_question_rejected() {
        let (state, _temp_dir) = create_test_router_state().await;
        let session_id = state.sessions.create(PromptMode::Inline).await;
        let result = ask(
            State(state),
            Path(session_id),
            Json(AskRequest {
                question: "  ".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
