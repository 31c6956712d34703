//! Operator notifications: where failures of background work are reported.
//!
//! Conversation partners never see raw errors; draining tasks, follow-ups and sticker replies
//! forward them here instead.

use async_trait::async_trait;
use chatsim_core::{Bot, ReplyTarget};
use std::sync::Arc;
use tracing::error;

/// Sink for operator-facing failure messages. Delivery is best effort.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify(&self, text: &str);
}

/// Sends notifications as plain messages to a fixed chat (by default the owner's private chat).
pub struct BotOperatorNotifier {
    bot: Arc<dyn Bot>,
    target: ReplyTarget,
}

impl BotOperatorNotifier {
    pub fn new(bot: Arc<dyn Bot>, operator_chat_id: i64) -> Self {
        Self {
            bot,
            target: ReplyTarget::chat(operator_chat_id),
        }
    }
}

#[async_trait]
impl OperatorNotifier for BotOperatorNotifier {
    async fn notify(&self, text: &str) {
        if let Err(e) = self.bot.send_message(&self.target, text).await {
            error!(error = %e, chat_id = self.target.chat_id, "Failed to notify operator");
        }
    }
}
