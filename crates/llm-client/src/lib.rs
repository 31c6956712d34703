//! # LLM client abstraction
//!
//! Defines the [`LlmClient`] trait and a Gemini implementation. The API key is passed per call
//! so callers can rotate credentials without rebuilding the client.

use async_trait::async_trait;

mod config;
mod error;
mod gemini_llm;

pub use config::{EnvLlmConfig, LlmConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use error::LlmError;
pub use gemini_llm::GeminiClient;

/// One piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Raw bytes; base64-encoded on the wire.
    InlineData { mime_type: String, data: Vec<u8> },
}

/// Ordered prompt parts sent as a single user turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(prompt.into())],
        }
    }

    pub fn with_image(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.parts.push(Part::InlineData {
            mime_type: mime_type.into(),
            data,
        });
        self
    }
}

/// Remote generation service: prompt in, reply text out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the trimmed reply text. Fails with [`LlmError::EmptyResponse`] when the model
    /// produced no text.
    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String, LlmError>;
}

/// Masks an API key for logging: first 7 chars + `***` + last 4, or `***` when 11 chars or fewer.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let len = chars.len();
    if len <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[len - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Test: Short or empty tokens are fully masked.**
    #[test]
    fn mask_token_short_returns_all_star() {
        assert_eq!(mask_token(""), "***");
        assert_eq!(mask_token("AIza123"), "***");
        assert_eq!(mask_token("AIzaSy12345"), "***");
    }

    /// **Test: Long tokens show first 7 and last 4 characters.**
    #[test]
    fn mask_token_long_shows_head_and_tail() {
        assert_eq!(mask_token("AIzaSyABCDEFGHIJKLMN"), "AIzaSyA***KLMN");
    }

    #[test]
    fn request_builder_keeps_part_order() {
        let request = GenerateRequest::text("look").with_image("image/jpeg", vec![1, 2]);
        assert_eq!(request.parts.len(), 2);
        assert_eq!(request.parts[0], Part::Text("look".to_string()));
    }
}
