//! # Response generator
//!
//! Wraps one generation call with credential rotation and a reply-length constraint:
//!
//! 1. Empty credential set: fail with [`GenerateError::NoCredentials`] before any network call.
//! 2. Up to the retry budget: call with the current key. Rate-limit or invalid-key errors rotate
//!    the key, back off and retry; any other error is returned as is.
//! 3. A reply over the length cap is regenerated with the same key, up to the attempt cap.
//! 4. The accepted reply is appended to the history and persisted before returning.

use std::sync::Arc;
use std::time::Duration;

use llm_client::{mask_token, GenerateRequest, LlmClient, LlmError};
use storage::StorageError;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::credentials::{CredentialError, CredentialRotator};
use crate::history::{ChatHistory, HistoryStore};

pub const DEFAULT_MAX_LENGTH: usize = 200;
pub const DEFAULT_MAX_LENGTH_ATTEMPTS: usize = 5;
pub const DEFAULT_ROTATION_BACKOFF: Duration = Duration::from_secs(4);

/// How many generation calls may be spent on credential errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    /// `factor` attempts per configured key (chat replies use 2).
    PerCredential(usize),
    /// Fixed number of attempts (single-shot uses such as photos).
    Fixed(usize),
}

impl RetryBudget {
    fn attempts(&self, credentials: usize) -> usize {
        match *self {
            RetryBudget::PerCredential(factor) => credentials.saturating_mul(factor),
            RetryBudget::Fixed(n) => n,
        }
        .max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPolicy {
    pub retry_budget: RetryBudget,
    /// Max reply length in characters; `None` accepts any length.
    pub max_length: Option<usize>,
    pub max_length_attempts: usize,
    pub rotation_backoff: Duration,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self::chat(
            DEFAULT_MAX_LENGTH,
            DEFAULT_MAX_LENGTH_ATTEMPTS,
            DEFAULT_ROTATION_BACKOFF,
        )
    }
}

impl GenerationPolicy {
    /// Chat replies: two attempts per key, length-capped.
    pub fn chat(max_length: usize, max_length_attempts: usize, rotation_backoff: Duration) -> Self {
        Self {
            retry_budget: RetryBudget::PerCredential(2),
            max_length: Some(max_length),
            max_length_attempts,
            rotation_backoff,
        }
    }

    /// Media replies: three attempts, no length cap.
    pub fn single_shot(rotation_backoff: Duration) -> Self {
        Self {
            retry_budget: RetryBudget::Fixed(3),
            max_length: None,
            max_length_attempts: 1,
            rotation_backoff,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("No API keys configured")]
    NoCredentials,

    #[error("All API keys failed after {attempts} attempts: {last_error}")]
    CredentialsExhausted { attempts: usize, last_error: String },

    #[error("Failed to generate a suitable response after {attempts} attempts (limit {max_length} characters)")]
    ResponseTooLong { attempts: usize, max_length: usize },

    #[error("Generation failed: {0}")]
    Upstream(LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CredentialError> for GenerateError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::NoCredentials => GenerateError::NoCredentials,
            CredentialError::Storage(e) => GenerateError::Storage(e),
        }
    }
}

enum Attempt {
    Accepted(String),
    TooLong { attempts: usize, max_length: usize },
}

pub struct ResponseGenerator {
    llm: Arc<dyn LlmClient>,
    credentials: CredentialRotator,
    history: HistoryStore,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, credentials: CredentialRotator, history: HistoryStore) -> Self {
        Self {
            llm,
            credentials,
            history,
        }
    }

    pub fn credentials(&self) -> &CredentialRotator {
        &self.credentials
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Generates a reply for `request` and appends it to `history`.
    #[instrument(skip(self, history, request, policy), fields(conversation = %history.conversation))]
    pub async fn generate(
        &self,
        history: &mut ChatHistory,
        request: &GenerateRequest,
        policy: &GenerationPolicy,
    ) -> Result<String, GenerateError> {
        let keys = self.credentials.list().await?;
        if keys.is_empty() {
            return Err(GenerateError::NoCredentials);
        }

        let budget = policy.retry_budget.attempts(keys.len());
        let mut last_error = String::new();

        for attempt in 1..=budget {
            let key = self.credentials.current().await?;
            info!(attempt, budget, api_key = %mask_token(&key), "step: generation attempt");

            match self.generate_within_length(&key, request, policy).await {
                Ok(Attempt::Accepted(reply)) => {
                    self.history.push_reply(history, &reply).await?;
                    info!(chars = reply.chars().count(), "step: reply accepted");
                    return Ok(reply);
                }
                Ok(Attempt::TooLong {
                    attempts,
                    max_length,
                }) => {
                    return Err(GenerateError::ResponseTooLong {
                        attempts,
                        max_length,
                    });
                }
                Err(e) if e.is_credential_error() => {
                    warn!(error = %e, attempt, "Credential error, rotating key");
                    last_error = e.to_string();
                    self.credentials.rotate().await?;
                    if attempt < budget {
                        tokio::time::sleep(policy.rotation_backoff).await;
                    }
                }
                Err(e) => return Err(GenerateError::Upstream(e)),
            }
        }

        Err(GenerateError::CredentialsExhausted {
            attempts: budget,
            last_error,
        })
    }

    async fn generate_within_length(
        &self,
        key: &str,
        request: &GenerateRequest,
        policy: &GenerationPolicy,
    ) -> Result<Attempt, LlmError> {
        let Some(max_length) = policy.max_length else {
            return Ok(Attempt::Accepted(self.llm.generate(key, request).await?));
        };

        let attempts = policy.max_length_attempts.max(1);
        for attempt in 1..=attempts {
            let reply = self.llm.generate(key, request).await?;
            let chars = reply.chars().count();
            if chars <= max_length {
                return Ok(Attempt::Accepted(reply));
            }
            warn!(attempt, chars, max_length, "Response too long, regenerating");
        }
        Ok(Attempt::TooLong {
            attempts,
            max_length,
        })
    }
}
