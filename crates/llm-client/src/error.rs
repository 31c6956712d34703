//! Error type for generation calls and its credential classification.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Non-success HTTP status with the API's error message.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response format: {0}")]
    ResponseFormat(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

impl LlmError {
    /// True for rate limits and rejected keys, the errors a credential rotation can fix.
    ///
    /// Status 429 first; otherwise a case-insensitive match on "429" or "invalid" in the error text.
    pub fn is_credential_error(&self) -> bool {
        match self {
            LlmError::Api { status: 429, .. } => true,
            LlmError::EmptyResponse | LlmError::ResponseFormat(_) => false,
            other => {
                let text = other.to_string().to_lowercase();
                text.contains("429") || text.contains("invalid")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_status_is_credential_error() {
        let err = LlmError::Api {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        };
        assert!(err.is_credential_error());
    }

    #[test]
    fn invalid_key_message_is_credential_error() {
        let err = LlmError::Api {
            status: 400,
            message: "API key not valid (INVALID_ARGUMENT)".to_string(),
        };
        assert!(err.is_credential_error());
    }

    #[test]
    fn other_errors_are_fatal() {
        let err = LlmError::Api {
            status: 500,
            message: "Internal error".to_string(),
        };
        assert!(!err.is_credential_error());
        assert!(!LlmError::EmptyResponse.is_credential_error());
    }
}
