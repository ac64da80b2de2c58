//! Gemini API request/response types
//!
//! Structs that mirror the Gemini API JSON format. Requests carry the full
//! role-tagged conversation history; responses are deserialized into typed
//! Rust structs.

use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug)]
pub struct GenerateResponse {
    /// List of candidate responses from the model
    pub candidates: Vec<Candidate>,
    /// Optional feedback about the prompt (e.g., if it was blocked)
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// A single candidate response from the model
#[derive(Deserialize, Debug)]
pub struct Candidate {
    /// The content of this candidate
    pub content: Content,
    /// Why the model stopped generating (if applicable)
    #[serde(default)]
    #[allow(dead_code)] // Part of API response format, may be used in future
    pub finish_reason: Option<String>,
}

/// Content structure containing parts of the response
#[derive(Deserialize, Debug)]
pub struct Content {
    /// List of content parts (typically one text part)
    pub parts: Vec<Part>,
    /// Role of the content (e.g., "model")
    #[allow(dead_code)] // Part of API response format, may be used in future
    pub role: String,
}

/// A single part of content (typically text)
#[derive(Deserialize, Debug)]
pub struct Part {
    /// The text content of this part
    pub text: String,
}

/// Feedback about the prompt (e.g., if it was blocked)
#[derive(Deserialize, Debug)]
pub struct PromptFeedback {
    /// Reason the prompt was blocked (if applicable)
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Request structure for the Gemini API
#[derive(Serialize, Debug)]
pub struct GenerateRequest {
    /// Ordered conversation history to send
    pub contents: Vec<RequestContent>,
}

/// One role-tagged entry of the request history
#[derive(Serialize, Debug, Clone)]
pub struct RequestContent {
    /// Role of this entry ("user", "model", or "tool")
    pub role: String,
    /// List of content parts
    pub parts: Vec<RequestPart>,
}

/// A single part for requests (typically text)
#[derive(Serialize, Debug, Clone)]
pub struct RequestPart {
    /// The text content
    pub text: String,
}
