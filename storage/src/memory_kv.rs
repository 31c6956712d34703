//! In-process key-value store. Nothing survives a restart.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::kv_store::KvStore;

#[derive(Default)]
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get_value(&self, namespace: &str, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    async fn set_value(&self, namespace: &str, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .get_mut(namespace)
            .map(|ns| ns.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn get_collection(&self, namespace: &str) -> Result<BTreeMap<String, Value>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries.get(namespace).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::KvStoreExt;

    #[tokio::test]
    async fn null_reads_back_as_missing() {
        let store = InMemoryKvStore::new();
        store
            .set_value("custom.gchat", "chat_history.1", Value::Null)
            .await
            .unwrap();

        let history: Option<Vec<String>> = store.get("custom.gchat", "chat_history.1").await.unwrap();
        assert!(history.is_none());
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = InMemoryKvStore::new();
        store.set("custom.gchat", "gemini_keys", &vec!["a"]).await.unwrap();

        let other: Vec<String> = store
            .get_or("custom.wchat", "gemini_keys", Vec::new())
            .await
            .unwrap();
        assert!(other.is_empty());
        assert!(!store.remove("custom.wchat", "gemini_keys").await.unwrap());
        assert!(store.remove("custom.gchat", "gemini_keys").await.unwrap());
    }
}
