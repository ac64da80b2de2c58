//! Remote generation service client
//!
//! HTTP client and serde mirror types for the Gemini `generateContent`
//! endpoint.

pub mod api_client;
pub mod types;

pub use api_client::GeminiClient;
