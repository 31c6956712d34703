//! Typing-pace simulation: keeps the "typing..." indicator alive for roughly as long as a human
//! would need to type the reply.

use std::sync::Arc;
use std::time::Duration;

use chatsim_core::{Bot, ReplyTarget};
use tracing::{debug, warn};

pub const DEFAULT_PER_CHAR_DELAY: Duration = Duration::from_millis(30);
pub const DEFAULT_TYPING_TICK: Duration = Duration::from_secs(2);
pub const DEFAULT_READ_CAP: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub per_char: Duration,
    /// Interval between typing pulses.
    pub tick: Duration,
    /// Upper bound of the pause before generation starts.
    pub read_cap: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            per_char: DEFAULT_PER_CHAR_DELAY,
            tick: DEFAULT_TYPING_TICK,
            read_cap: DEFAULT_READ_CAP,
        }
    }
}

pub struct TypingPacer {
    bot: Arc<dyn Bot>,
    config: PacingConfig,
}

impl TypingPacer {
    pub fn new(bot: Arc<dyn Bot>, config: PacingConfig) -> Self {
        Self { bot, config }
    }

    pub fn typing_duration(&self, text: &str) -> Duration {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        self.config
            .per_char
            .checked_mul(chars)
            .unwrap_or(Duration::MAX)
    }

    /// Pulses typing every tick until the typing duration of `text` has elapsed.
    /// Returns the number of pulses sent.
    pub async fn simulate(&self, target: &ReplyTarget, text: &str) -> u32 {
        if self.config.tick.is_zero() {
            return 0;
        }
        let total = self.typing_duration(text);
        let mut elapsed = Duration::ZERO;
        let mut pulses = 0;
        while elapsed < total {
            self.pulse(target).await;
            pulses += 1;
            tokio::time::sleep(self.config.tick).await;
            elapsed += self.config.tick;
        }
        debug!(chat_id = target.chat_id, pulses, ?total, "Typing simulated");
        pulses
    }

    /// `min(chars / 10, cap)` seconds.
    pub fn read_duration(&self, incoming: &str) -> Duration {
        let secs = incoming.chars().count() as f64 / 10.0;
        Duration::from_secs_f64(secs).min(self.config.read_cap)
    }

    /// One typing pulse, then the read pause for `incoming`.
    pub async fn read_pause(&self, target: &ReplyTarget, incoming: &str) {
        self.pulse(target).await;
        tokio::time::sleep(self.read_duration(incoming)).await;
    }

    async fn pulse(&self, target: &ReplyTarget) {
        if let Err(e) = self.bot.send_typing(target).await {
            warn!(error = %e, chat_id = target.chat_id, "Failed to send typing action");
        }
    }
}
