//! # chatsim
//!
//! Telegram bot that holds conversations in a configured persona. Private chats (gchat) and
//! group topics (wchat) are batched per conversation, answered by Gemini with API-key rotation,
//! paced with typing indicators, and optionally spoken through ElevenLabs. The owner manages
//! personas, keys and toggles with prefixed commands.

pub mod batcher;
pub mod chain;
pub mod cli;
pub mod components;
pub mod config;
pub mod credentials;
pub mod generator;
pub mod history;
pub mod notify;
pub mod pacer;
pub mod pipeline;
pub mod plugins;
pub mod runner;
pub mod settings;
pub mod telegram;
pub mod voice;

pub use cli::{load_config, Cli, Commands};

pub use chatsim_core::{
    init_tracing, Bot, Chat, ConversationId, CoreError, Handler, HandlerResponse, Message,
    MessageKind, ReplyTarget, Result, User,
};

pub use chain::HandlerChain;
pub use components::{build_app, build_bot_components, seed_credentials, App, BotComponents};
pub use config::BotConfig;
pub use runner::run_bot;

pub use telegram::{dispatch, run_repl, TelegramBotAdapter, TelegramMessageWrapper, TelegramUserWrapper};
