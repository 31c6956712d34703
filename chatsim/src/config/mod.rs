//! Bot configuration: BaseConfig (Telegram, log, DB, owner) + ChatConfig (pipeline tunables)
//! + Gemini and ElevenLabs configs from their client crates.

mod base;
mod bot_config;
mod chat_config;


pub use base::BaseConfig;
pub use bot_config::BotConfig;
pub use chat_config::{ChatConfig, DEFAULT_FOLLOW_UP_MESSAGE, DEFAULT_GCHAT_ROLE, DEFAULT_WCHAT_ROLE};
