//! Bot abstraction for delivering replies.
//!
//! [`Bot`] is transport-agnostic; the Telegram implementation lives in the `chatsim` crate.
//! Tests substitute a recording implementation.

use crate::error::Result;
use crate::types::ReplyTarget;
use async_trait::async_trait;
use std::path::Path;

/// Everything the pipeline needs from a chat transport.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a text message to the target chat (and topic, if any).
    async fn send_message(&self, target: &ReplyTarget, text: &str) -> Result<()>;

    /// Sends a text message as a reply to `message_id` in the target chat.
    async fn reply_to(&self, target: &ReplyTarget, message_id: &str, text: &str) -> Result<()>;

    /// Shows the "typing…" presence indicator once. Transports expire it after a few seconds.
    async fn send_typing(&self, target: &ReplyTarget) -> Result<()>;

    /// Uploads a local audio file as a voice note.
    async fn send_voice(&self, target: &ReplyTarget, audio: &Path) -> Result<()>;

    /// Downloads a file by transport file id and returns its bytes.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;
}
