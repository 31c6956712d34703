//! Core types: user, chat, message, conversation id, reply target, handler response, Handler trait.
//!
//! One file per main type.

mod chat;
mod conversation;
mod handler;
mod message;
mod response;
mod target;
mod user;

pub use chat::Chat;
pub use conversation::{ConversationId, ParseConversationError};
pub use handler::{Handler, ToCoreMessage, ToCoreUser};
pub use message::{Message, MessageDirection, MessageKind};
pub use response::HandlerResponse;
pub use target::ReplyTarget;
pub use user::User;
