//! LLM configuration: trait and env-based implementation.

use anyhow::{bail, Result};
use std::env;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini configuration interface.
pub trait LlmConfig: Send + Sync {
    fn base_url(&self) -> &str;
    fn model(&self) -> &str;
    /// Key stored into an empty credential set on startup.
    fn seed_api_key(&self) -> Option<&str>;
}

/// LLM config loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvLlmConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
}

impl LlmConfig for EnvLlmConfig {
    fn base_url(&self) -> &str {
        &self.gemini_base_url
    }
    fn model(&self) -> &str {
        &self.gemini_model
    }
    fn seed_api_key(&self) -> Option<&str> {
        self.gemini_api_key.as_deref()
    }
}

impl EnvLlmConfig {
    /// Load from `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let gemini_model = env::var("GEMINI_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let gemini_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());

        if !gemini_base_url.starts_with("http://") && !gemini_base_url.starts_with("https://") {
            bail!("GEMINI_BASE_URL must be an http(s) URL, got {}", gemini_base_url);
        }

        Ok(Self {
            gemini_api_key,
            gemini_base_url: gemini_base_url.trim_end_matches('/').to_string(),
            gemini_model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        env::remove_var("GEMINI_API_KEY");
        env::remove_var("GEMINI_MODEL");
        env::remove_var("GEMINI_BASE_URL");
    }

    #[test]
    #[serial]
    fn from_env_uses_defaults() {
        clear();
        let config = EnvLlmConfig::from_env().unwrap();
        assert_eq!(config.model(), DEFAULT_GEMINI_MODEL);
        assert_eq!(config.base_url(), DEFAULT_GEMINI_BASE_URL);
        assert!(config.seed_api_key().is_none());
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        clear();
        env::set_var("GEMINI_API_KEY", "AIza-test");
        env::set_var("GEMINI_MODEL", "gemini-1.5-flash");
        env::set_var("GEMINI_BASE_URL", "http://localhost:9000/");
        let config = EnvLlmConfig::from_env().unwrap();
        assert_eq!(config.seed_api_key(), Some("AIza-test"));
        assert_eq!(config.model(), "gemini-1.5-flash");
        assert_eq!(config.base_url(), "http://localhost:9000");
        clear();
    }

    #[test]
    #[serial]
    fn from_env_rejects_bad_base_url() {
        clear();
        env::set_var("GEMINI_BASE_URL", "localhost");
        assert!(EnvLlmConfig::from_env().is_err());
        clear();
    }
}
