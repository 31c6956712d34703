//! Where a reply goes: a chat and, in forum groups, a topic thread.

use serde::{Deserialize, Serialize};

/// Delivery address for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub chat_id: i64,
    /// Topic thread id; `None` for private chats and the general topic.
    pub thread_id: Option<i32>,
}

impl ReplyTarget {
    pub fn chat(chat_id: i64) -> Self {
        Self {
            chat_id,
            thread_id: None,
        }
    }

    /// Thread `0` is the general topic and is sent without a thread id.
    pub fn in_thread(chat_id: i64, thread_id: i32) -> Self {
        Self {
            chat_id,
            thread_id: (thread_id != 0).then_some(thread_id),
        }
    }
}
