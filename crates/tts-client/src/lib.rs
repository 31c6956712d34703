//! # TTS client
//!
//! ElevenLabs text-to-speech over REST. The API key is passed per call; rotation lives with the
//! caller.

mod config;
mod elevenlabs;
mod error;

pub use config::{TtsConfig, DEFAULT_ELEVENLABS_BASE_URL};
pub use elevenlabs::{ElevenLabsClient, VoiceSettings, DEFAULT_VOICE_ID};
pub use error::TtsError;
