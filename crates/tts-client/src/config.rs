//! ElevenLabs configuration from environment variables.

use std::env;

pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Key stored into an empty ElevenLabs credential set on startup.
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
}

impl TtsConfig {
    /// Load from `ELEVENLABS_API_KEY`, `ELEVENLABS_BASE_URL`.
    pub fn from_env() -> Self {
        let elevenlabs_api_key = env::var("ELEVENLABS_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let elevenlabs_base_url = env::var("ELEVENLABS_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ELEVENLABS_BASE_URL.to_string());
        Self {
            elevenlabs_api_key,
            elevenlabs_base_url: elevenlabs_base_url.trim_end_matches('/').to_string(),
        }
    }
}
