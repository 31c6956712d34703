use thiserror::Error;

/// `detail.status` values that mean "try the next key".
pub const ROTATING_STATUSES: [&str; 3] = [
    "quota_exceeded",
    "invalid_api_key",
    "too_many_concurrent_requests",
];

#[derive(Debug, Error)]
pub enum TtsError {
    /// Non-200 answer; `status` is the API's `detail.status` (may be empty).
    #[error("API Error ({http_status}): {message}")]
    Api {
        http_status: u16,
        status: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TtsError {
    /// True when another API key may succeed. Transport failures count too.
    pub fn should_rotate(&self) -> bool {
        match self {
            TtsError::Api { status, .. } => ROTATING_STATUSES.contains(&status.as_str()),
            TtsError::Http(_) => true,
        }
    }
}
