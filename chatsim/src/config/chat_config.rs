//! Chat pipeline tunables: reply constraint, retry backoff, typing pace, history window,
//! follow-ups and default personas. Loaded from env.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::generator::GenerationPolicy;
use crate::pacer::{PacingConfig, DEFAULT_READ_CAP};

pub const DEFAULT_FOLLOW_UP_MESSAGE: &str = "Hey! It's been a while. How can I assist you today?";

pub const DEFAULT_GCHAT_ROLE: &str = concat!(
    "You are Nick, a 20-year-old guy chatting on Telegram. You are friendly, warm and a bit ",
    "playful, and you keep conversations engaging. You use easy everyday English and keep ",
    "things simple. Write short, casual messages like a real human: one or two lines at most. ",
    "Rarely use emojis. Never send voice messages unless someone asks for a voice note; then ",
    "type .el before the message to turn it into voice. Do not include chat history or the ",
    "other person's name in your messages. Only send the final, polished response. Avoid ",
    "buzzwords, generic phrases and repeated questions."
);

pub const DEFAULT_WCHAT_ROLE: &str = concat!(
    "You are a regular member of this group chat. You are friendly and relaxed and you join ",
    "the conversation naturally. Write short, casual messages like a real human: one or two ",
    "lines at most. Rarely use emojis. Only send a voice note when someone asks for one; then ",
    "type .el before the message to turn it into voice. Do not repeat chat history or names. ",
    "Only send the final response."
);

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// REPLY_MAX_CHARS
    pub reply_max_chars: usize,
    /// REPLY_MAX_ATTEMPTS: regenerations of an over-long reply
    pub reply_max_attempts: usize,
    /// ROTATION_BACKOFF_SECS
    pub rotation_backoff_secs: u64,
    /// TYPING_CHAR_DELAY_MS
    pub typing_char_delay_ms: u64,
    /// TYPING_TICK_SECS
    pub typing_tick_secs: u64,
    /// HISTORY_MAX_ENTRIES (0 = unbounded)
    pub history_max_entries: usize,
    /// FOLLOW_UP_INTERVAL_SECS
    pub follow_up_interval_secs: u64,
    /// FOLLOW_UP_THRESHOLD_SECS
    pub follow_up_threshold_secs: u64,
    /// FOLLOW_UP_MESSAGE
    pub follow_up_message: String,
    /// GCHAT_ROLE
    pub gchat_role: String,
    /// WCHAT_ROLE
    pub wchat_role: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_max_chars: 200,
            reply_max_attempts: 5,
            rotation_backoff_secs: 4,
            typing_char_delay_ms: 30,
            typing_tick_secs: 2,
            history_max_entries: 200,
            follow_up_interval_secs: 60,
            follow_up_threshold_secs: 60,
            follow_up_message: DEFAULT_FOLLOW_UP_MESSAGE.to_string(),
            gchat_role: DEFAULT_GCHAT_ROLE.to_string(),
            wchat_role: DEFAULT_WCHAT_ROLE.to_string(),
        }
    }
}

/// Parses `name` when set and non-blank.
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        _ => Ok(default),
    }
}

fn env_text(name: &str, default: String) -> String {
    env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
}

impl ChatConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            reply_max_chars: env_parse("REPLY_MAX_CHARS", d.reply_max_chars)?,
            reply_max_attempts: env_parse("REPLY_MAX_ATTEMPTS", d.reply_max_attempts)?,
            rotation_backoff_secs: env_parse("ROTATION_BACKOFF_SECS", d.rotation_backoff_secs)?,
            typing_char_delay_ms: env_parse("TYPING_CHAR_DELAY_MS", d.typing_char_delay_ms)?,
            typing_tick_secs: env_parse("TYPING_TICK_SECS", d.typing_tick_secs)?,
            history_max_entries: env_parse("HISTORY_MAX_ENTRIES", d.history_max_entries)?,
            follow_up_interval_secs: env_parse(
                "FOLLOW_UP_INTERVAL_SECS",
                d.follow_up_interval_secs,
            )?,
            follow_up_threshold_secs: env_parse(
                "FOLLOW_UP_THRESHOLD_SECS",
                d.follow_up_threshold_secs,
            )?,
            follow_up_message: env_text("FOLLOW_UP_MESSAGE", d.follow_up_message),
            gchat_role: env_text("GCHAT_ROLE", d.gchat_role),
            wchat_role: env_text("WCHAT_ROLE", d.wchat_role),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.typing_tick_secs == 0 {
            anyhow::bail!("TYPING_TICK_SECS must be greater than 0");
        }
        if self.reply_max_attempts == 0 {
            anyhow::bail!("REPLY_MAX_ATTEMPTS must be greater than 0");
        }
        if self.follow_up_interval_secs == 0 {
            anyhow::bail!("FOLLOW_UP_INTERVAL_SECS must be greater than 0");
        }
        Ok(())
    }

    pub fn rotation_backoff(&self) -> Duration {
        Duration::from_secs(self.rotation_backoff_secs)
    }

    /// Length-capped policy for text replies.
    pub fn chat_policy(&self) -> GenerationPolicy {
        GenerationPolicy::chat(
            self.reply_max_chars,
            self.reply_max_attempts,
            self.rotation_backoff(),
        )
    }

    /// Uncapped single-shot policy for photo replies.
    pub fn photo_policy(&self) -> GenerationPolicy {
        GenerationPolicy::single_shot(self.rotation_backoff())
    }

    pub fn pacing(&self) -> PacingConfig {
        PacingConfig {
            per_char: Duration::from_millis(self.typing_char_delay_ms),
            tick: Duration::from_secs(self.typing_tick_secs),
            read_cap: DEFAULT_READ_CAP,
        }
    }

    pub fn follow_up_interval(&self) -> Duration {
        Duration::from_secs(self.follow_up_interval_secs)
    }

    pub fn follow_up_threshold(&self) -> Duration {
        Duration::from_secs(self.follow_up_threshold_secs)
    }
}
