//! Credential rotation over an ordered key list persisted in the key-value store.
//!
//! Each set lives in one namespace as a key list plus the active index. The index is shared by
//! every conversation using the set; writes are last-writer-wins.

use std::sync::Arc;

use storage::{KvStore, KvStoreExt, StorageError};
use thiserror::Error;
use tracing::info;

use llm_client::mask_token;

pub const GEMINI_KEYS_FIELD: &str = "gemini_keys";
pub const ELEVENLABS_NAMESPACE: &str = "custom.elevenlabs";
pub const ELEVENLABS_KEYS_FIELD: &str = "api_keys";
pub const INDEX_FIELD: &str = "current_key_index";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No API keys configured")]
    NoCredentials,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Keys plus the active index, as read in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub keys: Vec<String>,
    /// Clamped into `[0, len-1]`; 0 for an empty set.
    pub index: usize,
}

impl CredentialSnapshot {
    pub fn current(&self) -> Option<&str> {
        self.keys.get(self.index).map(String::as_str)
    }
}

#[derive(Clone)]
pub struct CredentialRotator {
    store: Arc<dyn KvStore>,
    namespace: String,
    keys_field: &'static str,
}

impl CredentialRotator {
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>, keys_field: &'static str) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            keys_field,
        }
    }

    /// Gemini keys of a chat profile (`gemini_keys` in its collection).
    pub fn gemini(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self::new(store, namespace, GEMINI_KEYS_FIELD)
    }

    /// ElevenLabs keys (`custom.elevenlabs` / `api_keys`).
    pub fn elevenlabs(store: Arc<dyn KvStore>) -> Self {
        Self::new(store, ELEVENLABS_NAMESPACE, ELEVENLABS_KEYS_FIELD)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn list(&self) -> Result<Vec<String>, CredentialError> {
        Ok(self
            .store
            .get_or(&self.namespace, self.keys_field, Vec::new())
            .await?)
    }

    pub async fn snapshot(&self) -> Result<CredentialSnapshot, CredentialError> {
        let keys = self.list().await?;
        let stored: usize = self.store.get_or(&self.namespace, INDEX_FIELD, 0).await?;
        let index = stored.min(keys.len().saturating_sub(1));
        Ok(CredentialSnapshot { keys, index })
    }

    /// The active key.
    pub async fn current(&self) -> Result<String, CredentialError> {
        let snapshot = self.snapshot().await?;
        snapshot
            .current()
            .map(str::to_string)
            .ok_or(CredentialError::NoCredentials)
    }

    /// Advances the index modulo the list length, persists it and returns the new active key.
    pub async fn rotate(&self) -> Result<String, CredentialError> {
        let snapshot = self.snapshot().await?;
        if snapshot.keys.is_empty() {
            return Err(CredentialError::NoCredentials);
        }
        let next = (snapshot.index + 1) % snapshot.keys.len();
        self.store.set(&self.namespace, INDEX_FIELD, &next).await?;
        info!(
            namespace = %self.namespace,
            index = next,
            key = %mask_token(&snapshot.keys[next]),
            "Rotated API key"
        );
        Ok(snapshot.keys[next].clone())
    }

    /// Appends a key. Returns false when it is already present.
    pub async fn add(&self, key: &str) -> Result<bool, CredentialError> {
        let mut keys = self.list().await?;
        if keys.iter().any(|k| k == key) {
            return Ok(false);
        }
        keys.push(key.to_string());
        self.store.set(&self.namespace, self.keys_field, &keys).await?;
        Ok(true)
    }

    /// Makes the key at 1-based `position` active. Returns false when out of range.
    pub async fn set_active(&self, position: usize) -> Result<bool, CredentialError> {
        let keys = self.list().await?;
        if position == 0 || position > keys.len() {
            return Ok(false);
        }
        self.store
            .set(&self.namespace, INDEX_FIELD, &(position - 1))
            .await?;
        Ok(true)
    }

    /// Removes the key at 1-based `position` and returns it. Later keys shift down; an active
    /// index past the end is clamped to `max(0, len-1)`.
    pub async fn delete(&self, position: usize) -> Result<Option<String>, CredentialError> {
        let mut keys = self.list().await?;
        if position == 0 || position > keys.len() {
            return Ok(None);
        }
        let removed = keys.remove(position - 1);
        self.store.set(&self.namespace, self.keys_field, &keys).await?;

        let stored: usize = self.store.get_or(&self.namespace, INDEX_FIELD, 0).await?;
        if stored >= keys.len() {
            let clamped = keys.len().saturating_sub(1);
            self.store.set(&self.namespace, INDEX_FIELD, &clamped).await?;
        }
        Ok(Some(removed))
    }

    /// Stores `key` as the only entry when the set is empty. Returns true when it did.
    pub async fn seed_if_empty(&self, key: &str) -> Result<bool, CredentialError> {
        if !self.list().await?.is_empty() {
            return Ok(false);
        }
        self.store
            .set(&self.namespace, self.keys_field, &vec![key.to_string()])
            .await?;
        self.store.set(&self.namespace, INDEX_FIELD, &0usize).await?;
        info!(namespace = %self.namespace, "Seeded API key from environment");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::InMemoryKvStore;

    async fn rotator_with(keys: &[&str]) -> CredentialRotator {
        let rotator = CredentialRotator::gemini(Arc::new(InMemoryKvStore::new()), "custom.gchat");
        for key in keys {
            rotator.add(key).await.unwrap();
        }
        rotator
    }

    #[tokio::test]
    async fn empty_set_has_no_credentials() {
        let rotator = rotator_with(&[]).await;
        assert!(matches!(
            rotator.current().await,
            Err(CredentialError::NoCredentials)
        ));
        assert!(matches!(
            rotator.rotate().await,
            Err(CredentialError::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn n_rotations_return_to_start() {
        let rotator = rotator_with(&["a", "b", "c"]).await;
        assert_eq!(rotator.current().await.unwrap(), "a");

        assert_eq!(rotator.rotate().await.unwrap(), "b");
        assert_eq!(rotator.rotate().await.unwrap(), "c");
        assert_eq!(rotator.rotate().await.unwrap(), "a");
        assert_eq!(rotator.snapshot().await.unwrap().index, 0);
    }

    #[tokio::test]
    async fn add_ignores_duplicates() {
        let rotator = rotator_with(&["a"]).await;
        assert!(!rotator.add("a").await.unwrap());
        assert_eq!(rotator.list().await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn set_active_is_one_based() {
        let rotator = rotator_with(&["a", "b"]).await;
        assert!(rotator.set_active(2).await.unwrap());
        assert_eq!(rotator.current().await.unwrap(), "b");
        assert!(!rotator.set_active(0).await.unwrap());
        assert!(!rotator.set_active(3).await.unwrap());
        assert_eq!(rotator.current().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn deleting_active_last_key_clamps_index() {
        let rotator = rotator_with(&["a", "b", "c"]).await;
        rotator.set_active(3).await.unwrap();

        assert_eq!(rotator.delete(3).await.unwrap().as_deref(), Some("c"));
        let snapshot = rotator.snapshot().await.unwrap();
        assert_eq!(snapshot.keys, vec!["a", "b"]);
        assert_eq!(snapshot.index, 1);
    }

    #[tokio::test]
    async fn deleting_earlier_key_keeps_index_in_range() {
        let rotator = rotator_with(&["a", "b"]).await;
        rotator.set_active(2).await.unwrap();

        rotator.delete(1).await.unwrap();
        let snapshot = rotator.snapshot().await.unwrap();
        assert_eq!(snapshot.keys, vec!["b"]);
        assert_eq!(snapshot.index, 0);
        assert_eq!(snapshot.current(), Some("b"));
    }

    #[tokio::test]
    async fn deleting_last_remaining_key_leaves_no_credentials() {
        let rotator = rotator_with(&["a"]).await;
        assert!(rotator.delete(2).await.unwrap().is_none());
        rotator.delete(1).await.unwrap();

        assert!(matches!(
            rotator.current().await,
            Err(CredentialError::NoCredentials)
        ));
        assert_eq!(rotator.snapshot().await.unwrap().index, 0);
    }

    #[tokio::test]
    async fn seed_only_fills_empty_set() {
        let rotator = rotator_with(&[]).await;
        assert!(rotator.seed_if_empty("env-key").await.unwrap());
        assert!(!rotator.seed_if_empty("other").await.unwrap());
        assert_eq!(rotator.list().await.unwrap(), vec!["env-key"]);
    }
}
