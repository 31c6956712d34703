//! Sticker replies: a random smiley after a short human-like pause.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use chatsim_core::{Bot, ReplyTarget};
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::info;

use crate::notify::OperatorNotifier;

pub const SMILEYS: [&str; 5] = ["-.-", "):", ":)", "*.*", ")*"];

/// Pause before answering, in seconds.
const DELAY_SECS: Range<f64> = 5.0..10.0;

pub struct StickerResponder {
    bot: Arc<dyn Bot>,
    notifier: Arc<dyn OperatorNotifier>,
}

impl StickerResponder {
    pub fn new(bot: Arc<dyn Bot>, notifier: Arc<dyn OperatorNotifier>) -> Self {
        Self { bot, notifier }
    }

    pub fn pick_smiley() -> &'static str {
        SMILEYS.choose(&mut rand::thread_rng()).copied().unwrap_or(":)")
    }

    pub fn pick_delay() -> Duration {
        Duration::from_secs_f64(rand::thread_rng().gen_range(DELAY_SECS))
    }

    /// Replies to the sticker message in the background. Failures go to the operator.
    pub fn respond(&self, target: ReplyTarget, message_id: String) -> JoinHandle<()> {
        let smiley = Self::pick_smiley();
        let delay = Self::pick_delay();
        let bot = Arc::clone(&self.bot);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match bot.reply_to(&target, &message_id, smiley).await {
                Ok(()) => info!(chat_id = target.chat_id, smiley, "step: sticker answered"),
                Err(e) => {
                    notifier
                        .notify(&format!("Error in sticker reply for {}: {}", target.chat_id, e))
                        .await
                }
            }
        })
    }
}
