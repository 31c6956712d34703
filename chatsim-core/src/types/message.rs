//! Message, kind and direction types for the core model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{chat::Chat, target::ReplyTarget, user::User};

/// Direction of the message (from user or from bot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

/// What the message carries besides text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    Sticker,
    /// Largest photo size; `content` holds the caption.
    Photo { file_id: String },
    Other,
}

/// A single message with user, chat, optional topic thread and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user: User,
    pub chat: Chat,
    /// Forum topic thread id, if the message was posted in one.
    pub thread_id: Option<i32>,
    /// Text for text messages, caption for media.
    pub content: String,
    pub kind: MessageKind,
    pub direction: MessageDirection,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Same chat, same topic.
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            chat_id: self.chat.id,
            thread_id: self.thread_id,
        }
    }

    /// Trimmed text of a text message; `None` for media or blank text.
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            MessageKind::Text => Some(self.content.trim()).filter(|t| !t.is_empty()),
            _ => None,
        }
    }
}
