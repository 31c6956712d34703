//! Conversation identity: one private user, or one group topic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::message::Message;

/// Partitions all per-conversation state (queues, timers, history, roles).
///
/// Display form is `"<user_id>"` or `"<group_id>:<thread_id>"`, and is the key suffix used in the
/// key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationId {
    User(i64),
    Topic { group: i64, thread: i32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid conversation id: {0}")]
pub struct ParseConversationError(pub String);

impl ConversationId {
    /// Topic in a group; messages outside a topic use thread `0`.
    pub fn topic(group: i64, thread: Option<i32>) -> Self {
        Self::Topic {
            group,
            thread: thread.unwrap_or(0),
        }
    }

    /// Private chats are keyed by sender, everything else by chat + topic.
    pub fn for_message(message: &Message) -> Self {
        if message.chat.is_private() {
            Self::User(message.user.id)
        } else {
            Self::topic(message.chat.id, message.thread_id)
        }
    }

    pub fn group(&self) -> Option<i64> {
        match self {
            Self::User(_) => None,
            Self::Topic { group, .. } => Some(*group),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{}", id),
            Self::Topic { group, thread } => write!(f, "{}:{}", group, thread),
        }
    }
}

impl FromStr for ConversationId {
    type Err = ParseConversationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseConversationError(s.to_string());
        match s.split_once(':') {
            Some((group, thread)) => Ok(Self::Topic {
                group: group.parse().map_err(|_| err())?,
                thread: thread.parse().map_err(|_| err())?,
            }),
            None => s.parse().map(Self::User).map_err(|_| err()),
        }
    }
}
