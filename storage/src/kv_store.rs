//! Key-value store abstraction: `(namespace, key) -> JSON value`.
//!
//! Namespaces mirror plugin collections (`custom.gchat`, `custom.wchat`, `custom.elevenlabs`).
//! A stored JSON `null` reads back as missing.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::StorageError;

/// Durable mapping from (namespace, key) to a JSON value.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get_value(&self, namespace: &str, key: &str) -> Result<Option<Value>, StorageError>;

    /// Inserts or replaces the value.
    async fn set_value(&self, namespace: &str, key: &str, value: Value) -> Result<(), StorageError>;

    /// Returns true when a value was removed.
    async fn remove(&self, namespace: &str, key: &str) -> Result<bool, StorageError>;

    /// All keys of a namespace, ordered by key.
    async fn get_collection(&self, namespace: &str) -> Result<BTreeMap<String, Value>, StorageError>;
}

/// Typed helpers over any [`KvStore`] (including `dyn KvStore`).
#[async_trait]
pub trait KvStoreExt {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<T>, StorageError>;

    /// `get` with a fallback for missing keys.
    async fn get_or<T: DeserializeOwned + Send>(
        &self,
        namespace: &str,
        key: &str,
        default: T,
    ) -> Result<T, StorageError>;

    async fn set<T: Serialize + Sync>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStoreExt for S {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.get_value(namespace, key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    async fn get_or<T: DeserializeOwned + Send>(
        &self,
        namespace: &str,
        key: &str,
        default: T,
    ) -> Result<T, StorageError> {
        Ok(self.get(namespace, key).await?.unwrap_or(default))
    }

    async fn set<T: Serialize + Sync>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)?;
        self.set_value(namespace, key, value).await
    }
}
