//! API module
//!
//! Contains HTTP request handlers for the chat and messaging endpoints

pub mod chat;
pub mod messages;
pub mod users;
pub mod utils;

pub use utils::{AppState, RouterState};
