//! SQLite-backed key-value store. Values are stored as JSON text.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::kv_store::KvStore;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct SqliteKvStore {
    pool_manager: SqlitePoolManager,
}

impl SqliteKvStore {
    /// Opens (or creates) the database and the `kv_entries` table.
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let store = Self { pool_manager };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating kv_entries table if not exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get_value(&self, namespace: &str, key: &str) -> Result<Option<Value>, StorageError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM kv_entries WHERE namespace = ? AND key = ?")
                .bind(namespace)
                .bind(key)
                .fetch_optional(self.pool_manager.pool())
                .await?;

        row.map(|(raw,)| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn set_value(&self, namespace: &str, key: &str, value: Value) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&value)?;

        sqlx::query(
            r#"
            INSERT INTO kv_entries (namespace, key, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(namespace)
        .bind(key)
        .bind(&raw)
        .bind(Utc::now())
        .execute(self.pool_manager.pool())
        .await?;

        debug!(namespace = %namespace, key = %key, bytes = raw.len(), "kv set");
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(self.pool_manager.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_collection(&self, namespace: &str) -> Result<BTreeMap<String, Value>, StorageError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM kv_entries WHERE namespace = ? ORDER BY key")
                .bind(namespace)
                .fetch_all(self.pool_manager.pool())
                .await?;

        rows.into_iter()
            .map(|(key, raw)| Ok((key, serde_json::from_str(&raw)?)))
            .collect()
    }
}
