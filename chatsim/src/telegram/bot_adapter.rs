//! Wraps teloxide::Bot and implements [`chatsim_core::Bot`]. Production code talks to Telegram;
//! tests substitute another Bot impl.

use async_trait::async_trait;
use chatsim_core::{Bot as CoreBot, CoreError, ReplyTarget, Result};
use std::path::Path;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, FileId, InputFile, MessageId, ReplyParameters, ThreadId};
use tracing::debug;

fn bot_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::Bot(e.to_string())
}

fn thread(target: &ReplyTarget) -> Option<ThreadId> {
    target.thread_id.map(|id| ThreadId(MessageId(id)))
}

/// Thin wrapper around teloxide::Bot that implements core's Bot trait.
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    /// Creates an adapter from an existing teloxide Bot.
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send_message(&self, target: &ReplyTarget, text: &str) -> Result<()> {
        let mut request = self.bot.send_message(ChatId(target.chat_id), text.to_string());
        if let Some(thread) = thread(target) {
            request = request.message_thread_id(thread);
        }
        request.await.map_err(bot_error)?;
        Ok(())
    }

    async fn reply_to(&self, target: &ReplyTarget, message_id: &str, text: &str) -> Result<()> {
        let id: i32 = message_id
            .parse()
            .map_err(|_| CoreError::Bot(format!("Invalid message_id for reply: {}", message_id)))?;
        let mut request = self
            .bot
            .send_message(ChatId(target.chat_id), text.to_string())
            .reply_parameters(ReplyParameters::new(MessageId(id)));
        if let Some(thread) = thread(target) {
            request = request.message_thread_id(thread);
        }
        request.await.map_err(bot_error)?;
        Ok(())
    }

    async fn send_typing(&self, target: &ReplyTarget) -> Result<()> {
        let mut request = self
            .bot
            .send_chat_action(ChatId(target.chat_id), ChatAction::Typing);
        if let Some(thread) = thread(target) {
            request = request.message_thread_id(thread);
        }
        request.await.map_err(bot_error)?;
        Ok(())
    }

    async fn send_voice(&self, target: &ReplyTarget, audio: &Path) -> Result<()> {
        let mut request = self
            .bot
            .send_voice(ChatId(target.chat_id), InputFile::file(audio.to_path_buf()));
        if let Some(thread) = thread(target) {
            request = request.message_thread_id(thread);
        }
        request.await.map_err(bot_error)?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(bot_error)?;
        let mut buffer = Vec::with_capacity(file.size as usize);
        self.bot
            .download_file(&file.path, &mut buffer)
            .await
            .map_err(bot_error)?;
        debug!(file_id, bytes = buffer.len(), "File downloaded");
        Ok(buffer)
    }
}
