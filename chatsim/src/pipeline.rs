//! # Chat pipelines
//!
//! Batch sinks that turn a drained batch into one reply:
//! - [`TextPipeline`]: joined text turn, length-capped reply, voice or paced text delivery.
//! - [`PhotoPipeline`]: buffered photos as inline image parts, single-shot reply to the last
//!   photo.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chatsim_core::{Bot, ReplyTarget};
use llm_client::GenerateRequest;
use tracing::{info, instrument};

use crate::batcher::{Batch, BatchSink};
use crate::generator::{GenerationPolicy, ResponseGenerator};
use crate::pacer::TypingPacer;
use crate::settings::ConversationSettings;
use crate::voice::{split_voice_marker, VoiceDelivery};

const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// One queued text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub text: String,
    /// Speaker name for the history turn.
    pub author: String,
    pub target: ReplyTarget,
}

/// One queued photo (largest size).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoItem {
    pub file_id: String,
    pub caption: String,
    pub author: String,
    pub target: ReplyTarget,
    /// Message the reply is threaded to.
    pub message_id: String,
}

/// Builds the photo prompt: chat context, then the instruction with the optional caption.
pub fn photo_prompt(context: &str, caption: &str) -> String {
    let caption = if caption.is_empty() {
        String::new()
    } else {
        format!(" Caption: {}", caption)
    };
    format!(
        "{}\n\nUser has sent multiple images.{} Generate a response based on the content of the \
         images and our chat context. Always follow the bot role and talk like a human.",
        context, caption
    )
}

pub struct TextPipeline {
    bot: Arc<dyn Bot>,
    settings: Arc<dyn ConversationSettings>,
    generator: Arc<ResponseGenerator>,
    pacer: Arc<TypingPacer>,
    voice: Arc<VoiceDelivery>,
    policy: GenerationPolicy,
}

impl TextPipeline {
    pub fn new(
        bot: Arc<dyn Bot>,
        settings: Arc<dyn ConversationSettings>,
        generator: Arc<ResponseGenerator>,
        pacer: Arc<TypingPacer>,
        voice: Arc<VoiceDelivery>,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            bot,
            settings,
            generator,
            pacer,
            voice,
            policy,
        }
    }
}

#[async_trait]
impl BatchSink<TextItem> for TextPipeline {
    #[instrument(skip(self, batch), fields(conversation = %batch.conversation, items = batch.items.len()))]
    async fn process(&self, batch: Batch<TextItem>) -> anyhow::Result<()> {
        let Some(last) = batch.items.last() else {
            return Ok(());
        };
        let target = last.target;
        let combined = batch
            .items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let role = self.settings.role(&batch.conversation).await?;
        let mut history = self
            .generator
            .history()
            .push_turn(&batch.conversation, &role, &last.author, &combined)
            .await
            .context("Failed to record user turn")?;
        let request = GenerateRequest::text(history.context());

        self.pacer.read_pause(&target, &combined).await;
        let reply = self
            .generator
            .generate(&mut history, &request, &self.policy)
            .await?;

        match split_voice_marker(&reply) {
            Some(spoken) => {
                let delivery = self.voice.deliver(&target, spoken).await?;
                info!(?delivery, "step: voice reply delivered");
            }
            None => {
                self.pacer.simulate(&target, &reply).await;
                self.bot.send_message(&target, &reply).await?;
                info!(chars = reply.chars().count(), "step: text reply sent");
            }
        }
        Ok(())
    }
}

pub struct PhotoPipeline {
    bot: Arc<dyn Bot>,
    settings: Arc<dyn ConversationSettings>,
    generator: Arc<ResponseGenerator>,
    policy: GenerationPolicy,
}

impl PhotoPipeline {
    pub fn new(
        bot: Arc<dyn Bot>,
        settings: Arc<dyn ConversationSettings>,
        generator: Arc<ResponseGenerator>,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            bot,
            settings,
            generator,
            policy,
        }
    }
}

#[async_trait]
impl BatchSink<PhotoItem> for PhotoPipeline {
    #[instrument(skip(self, batch), fields(conversation = %batch.conversation, photos = batch.items.len()))]
    async fn process(&self, batch: Batch<PhotoItem>) -> anyhow::Result<()> {
        let Some(last) = batch.items.last() else {
            return Ok(());
        };

        let mut images = Vec::with_capacity(batch.items.len());
        for item in &batch.items {
            let data = self
                .bot
                .download_file(&item.file_id)
                .await
                .with_context(|| format!("Failed to download photo {}", item.file_id))?;
            images.push(data);
        }
        info!(photos = images.len(), "step: photos downloaded");

        let caption = batch
            .items
            .iter()
            .map(|item| item.caption.trim())
            .filter(|caption| !caption.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let role = self.settings.role(&batch.conversation).await?;
        let mut history = self
            .generator
            .history()
            .push_turn(&batch.conversation, &role, &last.author, &caption)
            .await
            .context("Failed to record user turn")?;

        let request = images.into_iter().fold(
            GenerateRequest::text(photo_prompt(&history.context(), &caption)),
            |request, data| request.with_image(IMAGE_MIME_TYPE, data),
        );
        let reply = self
            .generator
            .generate(&mut history, &request, &self.policy)
            .await?;

        self.bot
            .reply_to(&last.target, &last.message_id, &reply)
            .await?;
        info!("step: photo reply sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_prompt_mentions_caption_only_when_present() {
        let with = photo_prompt("Role: r\nAnn: look", "my cat");
        assert!(with.starts_with("Role: r\nAnn: look\n\nUser has sent multiple images. Caption: my cat Generate"));

        let without = photo_prompt("Role: r", "");
        assert!(without.contains("multiple images. Generate a response"));
        assert!(without.ends_with("talk like a human."));
    }
}
