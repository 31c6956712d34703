//! Integration tests for [`storage::SqliteKvStore`].
//!
//! Covers upsert, typed reads, removal, collection listing and persistence across reopen.

use serde_json::json;
use storage::{KvStore, KvStoreExt, SqliteKvStore};

async fn temp_store() -> (tempfile::TempDir, String, SqliteKvStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("kv.db").to_string_lossy().to_string();
    let store = SqliteKvStore::new(&path)
        .await
        .expect("Failed to create store");
    (dir, path, store)
}

/// **Test: Set then get returns the stored value; a second set replaces it.**
///
/// **Setup:** Empty store in a temp file.
/// **Action:** `set` a key list twice, then `get`.
/// **Expected:** The second value wins.
#[tokio::test]
async fn test_set_overwrites_existing_value() {
    let (_dir, _path, store) = temp_store().await;

    store
        .set("custom.gchat", "gemini_keys", &vec!["k1".to_string()])
        .await
        .expect("Failed to set");
    store
        .set("custom.gchat", "gemini_keys", &vec!["k1".to_string(), "k2".to_string()])
        .await
        .expect("Failed to set");

    let keys: Option<Vec<String>> = store
        .get("custom.gchat", "gemini_keys")
        .await
        .expect("Failed to get");
    assert_eq!(keys, Some(vec!["k1".to_string(), "k2".to_string()]));
}

/// **Test: Missing key falls back to the default.**
///
/// **Setup:** Empty store.
/// **Action:** `get_or("custom.gchat", "current_key_index", 0usize)`.
/// **Expected:** Returns 0.
#[tokio::test]
async fn test_get_or_missing_key() {
    let (_dir, _path, store) = temp_store().await;

    let index: usize = store
        .get_or("custom.gchat", "current_key_index", 0)
        .await
        .expect("Failed to get");
    assert_eq!(index, 0);
}

/// **Test: Remove reports whether something was deleted.**
///
/// **Setup:** One stored key.
/// **Action:** Remove it twice.
/// **Expected:** First call true, second false; the value is gone.
#[tokio::test]
async fn test_remove() {
    let (_dir, _path, store) = temp_store().await;
    store
        .set_value("custom.gchat", "custom_roles.42", json!("pirate"))
        .await
        .expect("Failed to set");

    assert!(store.remove("custom.gchat", "custom_roles.42").await.unwrap());
    assert!(!store.remove("custom.gchat", "custom_roles.42").await.unwrap());
    assert!(store
        .get_value("custom.gchat", "custom_roles.42")
        .await
        .unwrap()
        .is_none());
}

/// **Test: Collection lists only its own namespace, ordered by key.**
///
/// **Setup:** Keys in `custom.wchat` and `custom.gchat`.
/// **Action:** `get_collection("custom.wchat")`.
/// **Expected:** Only the wchat keys, in key order.
#[tokio::test]
async fn test_get_collection_is_namespaced() {
    let (_dir, _path, store) = temp_store().await;
    store.set("custom.wchat", "b", &2).await.unwrap();
    store.set("custom.wchat", "a", &1).await.unwrap();
    store.set("custom.gchat", "c", &3).await.unwrap();

    let collection = store.get_collection("custom.wchat").await.unwrap();
    let keys: Vec<&String> = collection.keys().collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(collection["a"], json!(1));
}

/// **Test: Values survive closing and reopening the database file.**
///
/// **Setup:** Store a nested object, drop the store.
/// **Action:** Reopen the same path and read it back.
/// **Expected:** Same JSON value.
#[tokio::test]
async fn test_persists_across_reopen() {
    let (_dir, path, store) = temp_store().await;
    store
        .set_value("custom.wchat", "wchat_for_all_groups", json!({"-100": true}))
        .await
        .unwrap();
    drop(store);

    let reopened = SqliteKvStore::new(&path).await.expect("Failed to reopen");
    let value = reopened
        .get_value("custom.wchat", "wchat_for_all_groups")
        .await
        .unwrap();
    assert_eq!(value, Some(json!({"-100": true})));
}

/// **Test: In-memory URL gives a working store.**
///
/// **Setup:** `sqlite::memory:` URL.
/// **Action:** Set then get.
/// **Expected:** Value is visible through the single shared connection.
#[tokio::test]
async fn test_memory_url() {
    let store = SqliteKvStore::new("sqlite::memory:")
        .await
        .expect("Failed to create store");
    store.set("ns", "k", &"v").await.unwrap();

    let value: Option<String> = store.get("ns", "k").await.unwrap();
    assert_eq!(value.as_deref(), Some("v"));
}
