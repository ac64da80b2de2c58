//! Gemini API client
//!
//! Direct HTTP client for calling the Gemini API with a full conversation
//! history. One blocking request per call: no streaming, no retry, no
//! backoff. Service failures surface as `AppError::Upstream`.

use crate::config::GenerationConfig;
use crate::error::AppError;
use crate::gemini::types::{GenerateRequest, GenerateResponse, RequestContent};

/// HTTP client for the generation service
///
/// Holds the shared `reqwest` client (connection pooling) together with the
/// key, model, and base URL from configuration.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client from the generation configuration
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.api_base_url.clone(),
        }
    }

    /// Create a client against a custom base URL (used by tests)
    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Call the generation API with an ordered conversation history
    ///
    /// # Arguments
    /// * `contents` - The entire accumulated turn log, oldest first
    ///
    /// # Returns
    /// * `Ok(String)` - The text content of the first candidate
    /// * `Err(AppError)` - If the HTTP request, the service, or response
    ///   parsing failed
    pub async fn generate(&self, contents: Vec<RequestContent>) -> Result<String, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Upstream("API key is empty".to_string()));
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request_body = GenerateRequest { contents };

        tracing::debug!(
            model = %self.model,
            history_len = request_body.contents.len(),
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                AppError::Upstream(format!("Failed to send HTTP request to Gemini API: {}", e))
            })?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                error_body = %error_body,
                "Gemini API returned error status"
            );

            if status_code == 429 {
                return Err(AppError::Upstream(format!(
                    "Gemini API rate limit exceeded (HTTP {}): {}",
                    status_code, error_body
                )));
            }

            return Err(AppError::Upstream(format!(
                "Gemini API returned error status {}: {}",
                status_code, error_body
            )));
        }

        // Parse response body
        let response_body = response.text().await.map_err(|e| {
            AppError::Upstream(format!(
                "Failed to read response body from Gemini API: {}",
                e
            ))
        })?;

        let parsed: GenerateResponse = serde_json::from_str(&response_body).map_err(|e| {
            AppError::Upstream(format!(
                "Failed to parse JSON response from Gemini API: {} - Response body: {}",
                e, response_body
            ))
        })?;

        // Check for blocked prompt
        if let Some(feedback) = &parsed.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Err(AppError::Upstream(format!(
                    "Gemini API blocked the prompt: {}",
                    reason
                )));
            }
        }

        // Extract text content
        let candidate = parsed
            .candidates
            .first()
            .ok_or_else(|| AppError::Upstream("Gemini API response contains no candidates".to_string()))?;

        let part = candidate.content.parts.first().ok_or_else(|| {
            AppError::Upstream("Gemini API response candidate contains no parts".to_string())
        })?;

        let text = &part.text;
        if text.is_empty() {
            return Err(AppError::Upstream(
                "Gemini API response text is empty".to_string(),
            ));
        }

        tracing::debug!(
            response_len = text.len(),
            "Successfully received response from Gemini API"
        );

        Ok(text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::types::RequestPart;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn user_turn(text: &str) -> Vec<RequestContent> {
        vec![RequestContent {
            role: "user".to_string(),
            parts: vec![RequestPart {
                text: text.to_string(),
            }],
        }]
    }

    #[tokio::test]
    async fn test_generate_empty_api_key() {
        let client = GeminiClient::with_base_url("", "gemini-1.5-flash", "http://localhost:1");
        let result = client.generate(user_turn("test prompt")).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key is empty"));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_query(Matcher::AllOf(vec![Matcher::UrlEncoded(
                "key".into(),
                "test-key".into(),
            )]))
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{
                                "text": "This is a test response"
                            }],
                            "role": "model"
                        }
                    }]
                }"#,
            )
            .create_async()
            .await;

        let client = GeminiClient::with_base_url("test-key", "gemini-1.5-flash", &server.url());
        let result = client.generate(user_turn("test prompt")).await;

        mock.assert_async().await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "This is a test response");
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_sends_full_history_with_roles() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "first question"}]},
                    {"role": "model", "parts": [{"text": "first answer"}]},
                    {"role": "user", "parts": [{"text": "second question"}]}
                ]
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates": [{"content": {"parts": [{"text": "second answer"}], "role": "model"}}]}"#,
            )
            .create_async()
            .await;

        let history = vec![
            RequestContent {
                role: "user".to_string(),
                parts: vec![RequestPart {
                    text: "first question".to_string(),
                }],
            },
            RequestContent {
                role: "model".to_string(),
                parts: vec![RequestPart {
                    text: "first answer".to_string(),
                }],
            },
            RequestContent {
                role: "user".to_string(),
                parts: vec![RequestPart {
                    text: "second question".to_string(),
                }],
            },
        ];

        let client = GeminiClient::with_base_url("test-key", "gemini-1.5-flash", &server.url());
        let result = client.generate(history).await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "second answer");
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_empty_candidates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let client = GeminiClient::with_base_url("test-key", "gemini-1.5-flash", &server.url());
        let result = client.generate(user_turn("test prompt")).await;

        mock.assert_async().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no candidates"));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_blocked_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [],
                    "prompt_feedback": {
                        "block_reason": "SAFETY"
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = GeminiClient::with_base_url("test-key", "gemini-1.5-flash", &server.url());
        let result = client.generate(user_turn("test prompt")).await;

        mock.assert_async().await;
        assert!(result.is_err());
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("blocked the prompt"),
            "Error message should contain 'blocked the prompt', got: {}",
            error_msg
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_rate_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = GeminiClient::with_base_url("test-key", "gemini-1.5-flash", &server.url());
        let result = client.generate(user_turn("test prompt")).await;

        mock.assert_async().await;
        assert!(result.is_err());
        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("rate limit") || error_msg.contains("429"));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_invalid_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"This is not JSON"#)
            .create_async()
            .await;

        let client = GeminiClient::with_base_url("test-key", "gemini-1.5-flash", &server.url());
        let result = client.generate(user_turn("test prompt")).await;

        mock.assert_async().await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse JSON"));
    }
}
