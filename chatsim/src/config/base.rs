//! Base config: Telegram Bot connection, logging, database, owner. Loaded from env.

use anyhow::{Context, Result};
use std::env;

/// Base config: Telegram-related, logging, database and who may run commands.
#[derive(Debug, Clone)]
pub struct BaseConfig {
    /// BOT_TOKEN
    pub bot_token: String,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub telegram_api_url: Option<String>,
    /// Log file path
    pub log_file: String,
    /// Key-value store database (SQLite path, `file:` path or `sqlite::memory:`)
    pub database_url: String,
    /// OWNER_ID: the only user allowed to run commands; never answered by the chat plugins
    pub owner_id: i64,
    /// OPERATOR_CHAT_ID: where background failures are reported (defaults to the owner)
    pub operator_chat_id: i64,
    /// COMMAND_PREFIX
    pub command_prefix: String,
    /// MEDIA_DIR: temporary audio files
    pub media_dir: String,
}

fn parse_id(name: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a numeric Telegram id, got {:?}", name, value))
}

impl BaseConfig {
    /// Load from environment variables. `token` overrides BOT_TOKEN if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").context("BOT_TOKEN not set")?,
        };
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "./data/chatsim.db".to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/chatsim.log".to_string());
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        let owner_id = parse_id("OWNER_ID", &env::var("OWNER_ID").context("OWNER_ID not set")?)?;
        let operator_chat_id = match env::var("OPERATOR_CHAT_ID") {
            Ok(value) if !value.trim().is_empty() => parse_id("OPERATOR_CHAT_ID", &value)?,
            _ => owner_id,
        };
        let command_prefix = env::var("COMMAND_PREFIX").unwrap_or_else(|_| ".".to_string());
        let media_dir = env::var("MEDIA_DIR").unwrap_or_else(|_| "./data/media".to_string());

        Ok(Self {
            bot_token,
            telegram_api_url,
            log_file,
            database_url,
            owner_id,
            operator_chat_id,
            command_prefix,
            media_dir,
        })
    }

    /// Validate config (telegram_api_url must be a valid URL if set; prefix must be one
    /// non-alphanumeric token).
    pub fn validate(&self) -> Result<()> {
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        if self.command_prefix.is_empty()
            || self
                .command_prefix
                .chars()
                .any(|c| c.is_whitespace() || c.is_alphanumeric())
        {
            anyhow::bail!(
                "COMMAND_PREFIX must be non-empty punctuation, got {:?}",
                self.command_prefix
            );
        }
        Ok(())
    }
}
