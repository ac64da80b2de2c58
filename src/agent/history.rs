//! Conversation turn log
//!
//! In-memory ordered log of role-tagged turns. The full log is replayed to
//! the generation service on every request; there is no truncation and no
//! summarization, so the replay payload grows with session length.

use crate::gemini::types::{RequestContent, RequestPart};
use serde::{Deserialize, Serialize};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Turn authored by the end user (including embedded dataset prompts)
    User,
    /// Turn authored by the generation model
    Model,
    /// Result of a whitelisted command, fed back to the model
    Tool,
}

impl Role {
    /// Convert the role to its wire string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Tool => "tool",
        }
    }
}

/// One role-tagged content entry in a conversation log
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    /// Who authored the turn
    pub role: Role,
    /// Ordered content fragments; in practice always a single string
    pub parts: Vec<String>,
}

/// Ordered log of turns for one chat session
///
/// Turns are appended in strict chronological order and never removed.
#[derive(Debug, Default)]
pub struct TurnLog {
    turns: Vec<Turn>,
}

impl TurnLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append one turn with a single content fragment
    pub fn append(&mut self, role: Role, content: String) {
        self.turns.push(Turn {
            role,
            parts: vec![content],
        });
    }

    /// Number of turns in the log
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log has no turns yet
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Borrow the turns, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Serialize the entire log into generation request contents
    pub fn as_request_contents(&self) -> Vec<RequestContent> {
        self.turns
            .iter()
            .map(|t| RequestContent {
                role: t.role.as_str().to_string(),
                parts: t
                    .parts
                    .iter()
                    .map(|p| RequestPart { text: p.clone() })
                    .collect(),
            })
            .collect()
    }
}
