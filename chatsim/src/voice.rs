//! # Voice delivery
//!
//! A reply starting with `.el` is spoken instead of typed: the remainder goes through a
//! [`SpeechSynthesizer`], the audio is sent as a voice note and the temporary file is deleted.
//! Any synthesis or upload failure falls back to sending the remainder as text.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chatsim_core::{Bot, ReplyTarget};
use storage::{KvStore, KvStoreExt, StorageError};
use thiserror::Error;
use tracing::{info, instrument, warn};
use tts_client::{ElevenLabsClient, VoiceSettings};
use uuid::Uuid;

use crate::credentials::{CredentialError, CredentialRotator, ELEVENLABS_NAMESPACE};

pub const VOICE_MARKER: &str = ".el";

pub const VOICE_ID_FIELD: &str = "voice_id";
pub const STABILITY_FIELD: &str = "stability";
pub const SIMILARITY_BOOST_FIELD: &str = "similarity_boost";

/// Returns the text to speak when `reply` starts with the voice marker (leading whitespace
/// ignored). The remainder is trimmed and may be empty.
pub fn split_voice_marker(reply: &str) -> Option<&str> {
    reply
        .trim_start()
        .strip_prefix(VOICE_MARKER)
        .map(str::trim)
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("No ElevenLabs API keys configured")]
    NoCredentials,

    #[error("All ElevenLabs API keys failed: {0}")]
    AllKeysFailed(String),

    #[error("ElevenLabs error: {0}")]
    Api(String),

    #[error("Failed to write audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CredentialError> for VoiceError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::NoCredentials => VoiceError::NoCredentials,
            CredentialError::Storage(e) => VoiceError::Storage(e),
        }
    }
}

/// Turns text into an audio file on disk. The caller owns (and deletes) the file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<PathBuf, VoiceError>;
}

/// Voice parameters from `custom.elevenlabs`, each falling back to its default.
pub async fn load_voice_settings(store: &dyn KvStore) -> Result<VoiceSettings, StorageError> {
    let defaults = VoiceSettings::default();
    Ok(VoiceSettings {
        voice_id: store
            .get_or(ELEVENLABS_NAMESPACE, VOICE_ID_FIELD, defaults.voice_id)
            .await?,
        stability: store
            .get_or(ELEVENLABS_NAMESPACE, STABILITY_FIELD, defaults.stability)
            .await?,
        similarity_boost: store
            .get_or(
                ELEVENLABS_NAMESPACE,
                SIMILARITY_BOOST_FIELD,
                defaults.similarity_boost,
            )
            .await?,
    })
}

/// ElevenLabs synthesis with its own rotating key set.
pub struct ElevenLabsSynthesizer {
    client: ElevenLabsClient,
    credentials: CredentialRotator,
    store: Arc<dyn KvStore>,
    media_dir: PathBuf,
}

impl ElevenLabsSynthesizer {
    pub fn new(client: ElevenLabsClient, store: Arc<dyn KvStore>, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            credentials: CredentialRotator::elevenlabs(store.clone()),
            store,
            media_dir: media_dir.into(),
        }
    }

    pub fn credentials(&self) -> &CredentialRotator {
        &self.credentials
    }

    async fn write_audio(&self, audio: &[u8]) -> Result<PathBuf, VoiceError> {
        tokio::fs::create_dir_all(&self.media_dir).await?;
        let path = self.media_dir.join(format!("{}.mp3", Uuid::new_v4()));
        tokio::fs::write(&path, audio).await?;
        Ok(path)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    /// Tries each key at most once, starting from the active one. Quota, invalid-key and
    /// concurrency errors rotate; any other error aborts.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn synthesize(&self, text: &str) -> Result<PathBuf, VoiceError> {
        let keys = self.credentials.list().await?;
        if keys.is_empty() {
            return Err(VoiceError::NoCredentials);
        }
        let settings = load_voice_settings(self.store.as_ref()).await?;

        let mut last_error = String::new();
        for attempt in 1..=keys.len() {
            let key = self.credentials.current().await?;
            match self.client.text_to_speech(&key, &settings, text).await {
                Ok(audio) => {
                    let path = self.write_audio(&audio).await?;
                    info!(attempt, path = %path.display(), bytes = audio.len(), "step: speech synthesized");
                    return Ok(path);
                }
                Err(e) if e.should_rotate() => {
                    warn!(error = %e, attempt, "ElevenLabs key failed, rotating");
                    last_error = e.to_string();
                    self.credentials.rotate().await?;
                }
                Err(e) => return Err(VoiceError::Api(e.to_string())),
            }
        }
        Err(VoiceError::AllKeysFailed(last_error))
    }
}

/// How a marked reply reached the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Voice,
    TextFallback,
    /// Marker with nothing after it; nothing was sent.
    Empty,
}

pub struct VoiceDelivery {
    bot: Arc<dyn Bot>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl VoiceDelivery {
    pub fn new(bot: Arc<dyn Bot>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { bot, synthesizer }
    }

    /// Speaks `text` into `target`, falling back to a text message.
    #[instrument(skip(self, text), fields(chat_id = target.chat_id))]
    pub async fn deliver(&self, target: &ReplyTarget, text: &str) -> chatsim_core::Result<Delivery> {
        if text.is_empty() {
            warn!("Voice marker without text, nothing to send");
            return Ok(Delivery::Empty);
        }

        match self.synthesizer.synthesize(text).await {
            Ok(path) => {
                let sent = self.bot.send_voice(target, &path).await;
                remove_audio(&path).await;
                match sent {
                    Ok(()) => Ok(Delivery::Voice),
                    Err(e) => {
                        warn!(error = %e, "Voice upload failed, sending text");
                        self.bot.send_message(target, text).await?;
                        Ok(Delivery::TextFallback)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Speech synthesis failed, sending text");
                self.bot.send_message(target, text).await?;
                Ok(Delivery::TextFallback)
            }
        }
    }
}

pub(crate) async fn remove_audio(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(error = %e, path = %path.display(), "Failed to remove audio file");
    }
}
