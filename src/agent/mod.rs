//! Data-chat agent module
//!
//! Per-session conversation state for the CSV question-answering agent: the
//! turn log replayed to the generation service, the parsed dataset snapshot,
//! and the whitelisted command evaluator.

pub mod commands;
pub mod dataset;
pub mod history;
pub mod session;

pub use dataset::Dataset;
pub use history::{Role, Turn, TurnLog};
pub use session::{ChatSession, PromptMode, SessionRegistry};
