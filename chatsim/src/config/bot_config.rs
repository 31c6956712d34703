//! BotConfig: BaseConfig + ChatConfig + Gemini and ElevenLabs configs. Use load() for env-based
//! loading.

use anyhow::Result;
use llm_client::EnvLlmConfig;
use tts_client::TtsConfig;

use super::{BaseConfig, ChatConfig};

/// Bot config. Use BotConfig::load() for env-based loading.
pub struct BotConfig {
    pub base: BaseConfig,
    pub chat: ChatConfig,
    pub llm: EnvLlmConfig,
    pub tts: TtsConfig,
}

impl BotConfig {
    /// Load full config from environment variables. If `token` is provided it overrides BOT_TOKEN.
    /// Call validate() after load to check config before init.
    pub fn load(token: Option<String>) -> Result<Self> {
        Ok(Self {
            base: BaseConfig::load(token)?,
            chat: ChatConfig::from_env()?,
            llm: EnvLlmConfig::from_env()?,
            tts: TtsConfig::from_env(),
        })
    }

    /// Validate config. Call after load() to fail fast before init.
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.chat.validate()
    }

    pub fn base(&self) -> &BaseConfig {
        &self.base
    }
    pub fn chat(&self) -> &ChatConfig {
        &self.chat
    }

    // --- Base config getters ---
    pub fn bot_token(&self) -> &str {
        &self.base.bot_token
    }
    pub fn database_url(&self) -> &str {
        &self.base.database_url
    }
    pub fn log_file(&self) -> &str {
        &self.base.log_file
    }
    pub fn telegram_api_url(&self) -> Option<&str> {
        self.base.telegram_api_url.as_deref()
    }
    pub fn owner_id(&self) -> i64 {
        self.base.owner_id
    }
    pub fn operator_chat_id(&self) -> i64 {
        self.base.operator_chat_id
    }
    pub fn command_prefix(&self) -> &str {
        &self.base.command_prefix
    }
    pub fn media_dir(&self) -> &str {
        &self.base.media_dir
    }
}
