//! `POST /v1/text-to-speech/{voice_id}`; 200 answers carry the MP3 bytes.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::config::DEFAULT_ELEVENLABS_BASE_URL;
use crate::error::TtsError;

pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Voice parameters; each is stored separately and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub voice_id: String,
    pub stability: f64,
    pub similarity_boost: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            stability: 0.3,
            similarity_boost: 0.9,
        }
    }
}

#[derive(Serialize)]
struct SpeechBody<'a> {
    text: &'a str,
    voice_settings: WireVoiceSettings,
}

#[derive(Serialize)]
struct WireVoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    detail: ErrorDetail,
}

#[derive(Deserialize, Default)]
struct ErrorDetail {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for ElevenLabsClient {
    fn default() -> Self {
        Self::new(DEFAULT_ELEVENLABS_BASE_URL)
    }
}

impl ElevenLabsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Synthesizes `text` with one key. Returns the audio bytes.
    #[instrument(skip(self, api_key, settings, text), fields(voice_id = %settings.voice_id))]
    pub async fn text_to_speech(
        &self,
        api_key: &str,
        settings: &VoiceSettings,
        text: &str,
    ) -> Result<Vec<u8>, TtsError> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, settings.voice_id);
        let body = SpeechBody {
            text,
            voice_settings: WireVoiceSettings {
                stability: settings.stability,
                similarity_boost: settings.similarity_boost,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let http_status = response.status();
        if http_status.is_success() {
            let audio = response.bytes().await?.to_vec();
            info!(bytes = audio.len(), "ElevenLabs audio received");
            return Ok(audio);
        }

        let raw = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&raw)
            .unwrap_or_default()
            .detail;
        let message = if detail.message.is_empty() {
            "Unknown error".to_string()
        } else {
            detail.message
        };
        warn!(http_status = http_status.as_u16(), status = %detail.status, "ElevenLabs error");

        Err(TtsError::Api {
            http_status: http_status.as_u16(),
            status: detail.status,
            message,
        })
    }
}
