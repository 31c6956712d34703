//! Storage crate: the key-value side-table every plugin keeps its state in.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`kv_store`] – `KvStore` trait and typed `KvStoreExt` helpers
//! - [`sqlite_kv`] – `SqliteKvStore` (SQLite via sqlx)
//! - [`memory_kv`] – `InMemoryKvStore` (tests, ephemeral runs)
//! - [`sqlite_pool`] – `SqlitePoolManager`

mod error;
mod kv_store;
mod memory_kv;
mod sqlite_kv;
mod sqlite_pool;

pub use error::StorageError;
pub use kv_store::{KvStore, KvStoreExt};
pub use memory_kv::InMemoryKvStore;
pub use sqlite_kv::SqliteKvStore;
pub use sqlite_pool::SqlitePoolManager;
