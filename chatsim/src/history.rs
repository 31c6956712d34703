//! Persisted chat history per conversation: a `Role: ...` preamble, then user turns
//! (`"<author>: <text>"`) and raw replies.
//!
//! Stored under `chat_history.<conversation>` in the profile's collection. Non-preamble entries
//! are bounded by a sliding window; the preamble is never evicted.
//!
//! The text and photo drains of one conversation both append here. Every write holds that
//! conversation's lock and re-reads the stored entries, so neither drain overwrites the other.

use std::sync::Arc;

use chatsim_core::ConversationId;
use dashmap::DashMap;
use storage::{KvStore, KvStoreExt, StorageError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

pub const ROLE_PREFIX: &str = "Role: ";
pub const DEFAULT_HISTORY_MAX_ENTRIES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    pub conversation: ConversationId,
    pub entries: Vec<String>,
}

impl ChatHistory {
    /// Prompt text: entries joined by newlines.
    pub fn context(&self) -> String {
        self.entries.join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KvStore>,
    namespace: String,
    /// `0` disables trimming.
    max_entries: usize,
    locks: Arc<DashMap<ConversationId, Arc<Mutex<()>>>>,
}

fn history_key(conversation: &ConversationId) -> String {
    format!("chat_history.{}", conversation)
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>, max_entries: usize) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            max_entries,
            locks: Arc::new(DashMap::new()),
        }
    }

    async fn lock(&self, conversation: &ConversationId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(conversation.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        lock.lock_owned().await
    }

    pub async fn load(&self, conversation: &ConversationId) -> Result<Option<ChatHistory>, StorageError> {
        let entries: Option<Vec<String>> = self
            .store
            .get(&self.namespace, &history_key(conversation))
            .await?;
        Ok(entries.map(|entries| ChatHistory {
            conversation: conversation.clone(),
            entries,
        }))
    }

    /// Appends a user turn, creating the history with the role preamble on first use.
    pub async fn push_turn(
        &self,
        conversation: &ConversationId,
        role: &str,
        author: &str,
        text: &str,
    ) -> Result<ChatHistory, StorageError> {
        let _guard = self.lock(conversation).await;
        let mut history = self.load(conversation).await?.unwrap_or_else(|| ChatHistory {
            conversation: conversation.clone(),
            entries: vec![format!("{}{}", ROLE_PREFIX, role)],
        });
        history.entries.push(format!("{}: {}", author, text));
        self.save(&mut history).await?;
        Ok(history)
    }

    /// Appends an accepted reply to the stored history and persists.
    ///
    /// Entries written since `history` was loaded are kept; `history` is refreshed to the saved
    /// state.
    pub async fn push_reply(&self, history: &mut ChatHistory, reply: &str) -> Result<(), StorageError> {
        let _guard = self.lock(&history.conversation).await;
        if let Some(latest) = self.load(&history.conversation).await? {
            *history = latest;
        }
        history.entries.push(reply.to_string());
        self.save(history).await
    }

    /// Returns true when a history existed.
    pub async fn clear(&self, conversation: &ConversationId) -> Result<bool, StorageError> {
        let _guard = self.lock(conversation).await;
        self.store
            .remove(&self.namespace, &history_key(conversation))
            .await
    }

    async fn save(&self, history: &mut ChatHistory) -> Result<(), StorageError> {
        self.trim(&mut history.entries);
        debug!(conversation = %history.conversation, entries = history.entries.len(), "Saving chat history");
        self.store
            .set(&self.namespace, &history_key(&history.conversation), &history.entries)
            .await
    }

    fn trim(&self, entries: &mut Vec<String>) {
        if self.max_entries == 0 {
            return;
        }
        let preamble = usize::from(entries.first().is_some_and(|e| e.starts_with(ROLE_PREFIX)));
        let body = entries.len() - preamble;
        if body > self.max_entries {
            entries.drain(preamble..preamble + (body - self.max_entries));
        }
    }
}
