//! # chatsim-core
//!
//! Core types and traits for the chat-simulation bot: [`Bot`], [`Handler`], message, user and
//! conversation types, and tracing initialization. Transport-agnostic; the Telegram adapters in
//! the `chatsim` crate implement [`Bot`] and convert updates into [`Message`].

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::Bot;
pub use error::{CoreError, HandlerError, Result};
pub use logger::init_tracing;
pub use types::{
    Chat, ConversationId, Handler, HandlerResponse, Message, MessageDirection, MessageKind,
    ParseConversationError, ReplyTarget, ToCoreMessage, ToCoreUser, User,
};
