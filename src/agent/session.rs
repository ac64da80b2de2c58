//! Chat sessions and the session registry
//!
//! One `ChatSession` per session id: the conversation turn log, the current
//! dataset snapshot, and the prompt mode. Sessions are created lazily,
//! exactly once per id, and mutated in place thereafter; replacing a session
//! wholesale would lose its history.
//!
//! Each question runs one of two shapes: a single generation call whose
//! reply is the answer, or - when the reply carries the command marker - a
//! command evaluation followed by exactly one follow-up call. There is no
//! deeper nesting, no loop, and no retry.

use crate::agent::commands;
use crate::agent::dataset::Dataset;
use crate::agent::history::{Role, TurnLog};
use crate::error::AppError;
use crate::gemini::GeminiClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// A reply is a command request if and only if it starts with this marker
/// (case-insensitive); everything after the colon, trimmed, is the command.
pub const COMMAND_MARKER: &str = "code:";

/// How the dataset is exposed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Every question embeds the full dataset serialized as delimited text
    #[default]
    Inline,
    /// The model is told the dataset's shape and may request computed
    /// values via the command marker
    Tool,
}

/// Per-session chat state
pub struct ChatSession {
    mode: PromptMode,
    log: TurnLog,
    dataset: Option<Dataset>,
}

impl ChatSession {
    /// Create an empty session with the given prompt mode
    pub fn new(mode: PromptMode) -> Self {
        Self {
            mode,
            log: TurnLog::new(),
            dataset: None,
        }
    }

    /// The session's prompt mode
    pub fn mode(&self) -> PromptMode {
        self.mode
    }

    /// Borrow the turn log
    pub fn log(&self) -> &TurnLog {
        &self.log
    }

    /// Borrow the current dataset snapshot, if one was uploaded
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Replace the dataset snapshot
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
    }

    /// Ask one question about the loaded dataset
    ///
    /// Appends the user turn and replays the entire accumulated log to the
    /// generation service. A reply starting with the command marker is
    /// evaluated against the dataset snapshot; the textual result is
    /// appended as a tool turn and exactly one follow-up call produces the
    /// final reply. The final reply is appended as a model turn and
    /// returned.
    ///
    /// A remote-service error propagates to the caller; the already-appended
    /// user turn stays in the log.
    pub async fn ask(
        &mut self,
        question: &str,
        client: &GeminiClient,
    ) -> Result<String, AppError> {
        let dataset = self.dataset.as_ref().ok_or_else(|| {
            AppError::Validation("No dataset loaded for this session".to_string())
        })?;

        if self.mode == PromptMode::Tool && self.log.is_empty() {
            self.log.append(Role::User, tool_instructions(dataset));
        }

        let prompt = match self.mode {
            PromptMode::Inline => inline_prompt(dataset, question),
            PromptMode::Tool => question.to_string(),
        };
        self.log.append(Role::User, prompt);

        let reply = client.generate(self.log.as_request_contents()).await?;
        let reply = reply.trim();

        if let Some(command) = strip_marker(reply) {
            debug!(command = %command, "Model requested a command");
            let result = commands::evaluate(dataset, command);
            self.log.append(Role::Tool, result);

            let final_reply = client.generate(self.log.as_request_contents()).await?;
            let final_reply = final_reply.trim().to_string();
            self.log.append(Role::Model, final_reply.clone());
            Ok(final_reply)
        } else {
            let reply = reply.to_string();
            self.log.append(Role::Model, reply.clone());
            Ok(reply)
        }
    }
}

/// Build the inline-mode prompt embedding the whole dataset
fn inline_prompt(dataset: &Dataset, question: &str) -> String {
    format!(
        "You are a data analysis assistant.\n\
         The following is a dataset in CSV format:\n\n\
         {}\n\
         Based on this data, answer the following question:\n\
         {}",
        dataset.to_delimited(),
        question
    )
}

/// Build the tool-mode instruction turn, seeded once per session
fn tool_instructions(dataset: &Dataset) -> String {
    format!(
        "You are a data analysis assistant. A dataset with {} rows and the columns {} \
         is loaded, but you cannot see its contents. When you need a computed value, \
         reply with a single line of the form `{} <command>`, where <command> is one of \
         count(), sum(column), mean(column), min(column), max(column), distinct(column), \
         count_where(column, value). The computed result will be sent back to you. \
         Otherwise answer the user's question directly in natural language.",
        dataset.row_count(),
        dataset.columns().join(", "),
        COMMAND_MARKER
    )
}

/// Return the command string when the reply starts with the marker
fn strip_marker(reply: &str) -> Option<&str> {
    let head = reply.get(..COMMAND_MARKER.len())?;
    if head.eq_ignore_ascii_case(COMMAND_MARKER) {
        Some(reply[COMMAND_MARKER.len()..].trim())
    } else {
        None
    }
}

/// Registry of live chat sessions, keyed by session id
///
/// One session per id. Sessions are created on demand and persist for the
/// lifetime of the process.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<ChatSession>>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new session and return its id
    pub async fn create(&self, mode: PromptMode) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(ChatSession::new(mode)));
        self.sessions.write().await.insert(id.clone(), session);
        info!(session_id = %id, ?mode, "Chat session created");
        id
    }

    /// Look up an existing session
    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Get the session for an id, creating it on first use
    ///
    /// Initialization happens exactly once per id; later calls return the
    /// same session so in-place mutation preserves its history.
    pub async fn get_or_create(&self, id: &str, mode: PromptMode) -> Arc<Mutex<ChatSession>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(id) {
                debug!(session_id = %id, "Reusing existing chat session");
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        // A writer may have raced us between the locks
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(session_id = %id, ?mode, "Chat session created");
                Arc::new(Mutex::new(ChatSession::new(mode)))
            })
            .clone()
    }

    /// Number of live sessions
    #[allow(dead_code)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_marker_case_insensitive() {
        assert_eq!(strip_marker("code: sum(price)"), Some("sum(price)"));
        assert_eq!(strip_marker("CODE:   count()"), Some("count()"));
        assert_eq!(strip_marker("Code:mean(x)"), Some("mean(x)"));
        assert_eq!(strip_marker("The code: is irrelevant"), None);
        assert_eq!(strip_marker("plain answer"), None);
        assert_eq!(strip_marker("c"), None);
    }

    #[tokio::test]
    async fn test_ask_without_dataset_is_a_validation_error() {
        let client = GeminiClient::with_base_url("key", "model", "http://localhost:1");
        let mut session = ChatSession::new(PromptMode::Inline);
        let result = session.ask("how many rows?", &client).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        // Nothing was appended: the dataset check happens first
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_registry_initializes_once_per_id() {
        let registry = SessionRegistry::new();
        let first = registry.get_or_create("abc", PromptMode::Inline).await;
        first
            .lock()
            .await
            .set_dataset(Dataset::parse("a\n1\n").unwrap());

        let second = registry.get_or_create("abc", PromptMode::Inline).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.lock().await.dataset().is_some());
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_registry_create_returns_distinct_ids() {
        let registry = SessionRegistry::new();
        let a = registry.create(PromptMode::Inline).await;
        let b = registry.create(PromptMode::Tool).await;
        assert_ne!(a, b);
        assert_eq!(registry.get(&a).await.unwrap().lock().await.mode(), PromptMode::Inline);
        assert_eq!(registry.get(&b).await.unwrap().lock().await.mode(), PromptMode::Tool);
    }

    #[test]
    fn test_inline_prompt_embeds_dataset_and_question() {
        let ds = Dataset::parse("a,b\n1,2\n").unwrap();
        let prompt = inline_prompt(&ds, "what is the sum of a?");
        assert!(prompt.contains("a,b\n1,2\n"));
        assert!(prompt.contains("what is the sum of a?"));
    }

    #[test]
    fn test_tool_instructions_name_the_columns_not_the_data() {
        let ds = Dataset::parse("name,price\namy,10\n").unwrap();
        let instructions = tool_instructions(&ds);
        assert!(instructions.contains("name, price"));
        assert!(instructions.contains("1 rows"));
        assert!(!instructions.contains("amy"));
    }
}
