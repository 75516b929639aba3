//! Key-value persistence for session state.
//!
//! The session flow only needs a handful of string values to survive a full
//! page reload or a round trip through the external scan app. This module
//! defines the [`KeyValueStore`] contract and two implementations:
//!
//! - [`MemoryStore`]: process-local; clones share the same map.
//! - [`SqliteStore`]: durable, backed by the `session_store` table.

use crate::connection::Database;
use crate::error::StorageResult;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Durable string key-value store.
///
/// Futures are `Send` so a flow controller holding a store can be driven from
/// a spawned Tokio task.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys yield `None`.
    fn get(&self, key: &str) -> impl Future<Output = StorageResult<Option<String>>> + Send;

    /// Insert or replace a value.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = StorageResult<()>> + Send;

    /// Delete a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = StorageResult<()>> + Send;
}

/// In-memory store.
///
/// Cloning yields a handle to the same map, which lets tests simulate a
/// reload by building a second controller over a clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// SQLite implementation of [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a store over an opened database
    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}

impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value
            FROM session_store
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO session_store (key, value, updated_at)
            VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM session_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("sessionId").await.unwrap().is_none());

        store.set("sessionId", "abc").await.unwrap();
        assert_eq!(store.get("sessionId").await.unwrap().as_deref(), Some("abc"));

        store.set("sessionId", "def").await.unwrap();
        assert_eq!(store.get("sessionId").await.unwrap().as_deref(), Some("def"));
        assert_eq!(store.len().await, 1);

        store.remove("sessionId").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let reloaded = store.clone();

        store.set("pendingBarcode", "A").await.unwrap();
        assert_eq!(
            reloaded.get("pendingBarcode").await.unwrap().as_deref(),
            Some("A")
        );
    }

    #[tokio::test]
    async fn test_remove_missing_key() {
        let store = MemoryStore::new();
        store.remove("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteStore::from_database(&db);

        assert!(store.get("pairs").await.unwrap().is_none());

        store.set("pairs", r#"{"A":"1"}"#).await.unwrap();
        store.set("pairs", r#"{"A":"2"}"#).await.unwrap();
        assert_eq!(
            store.get("pairs").await.unwrap().as_deref(),
            Some(r#"{"A":"2"}"#)
        );

        store.remove("pairs").await.unwrap();
        assert!(store.get("pairs").await.unwrap().is_none());
    }

    #[rstest]
    #[case::empty("")]
    #[case::json(r#"{"8901435003005":"5faf2ecb9e581b"}"#)]
    #[case::quotes("it's \"quoted\"")]
    #[case::unicode("código ✓")]
    #[case::multiline("line one\nline two")]
    #[tokio::test]
    async fn test_sqlite_store_preserves_value(#[case] value: &str) {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteStore::from_database(&db);

        store.set("pendingBarcode", value).await.unwrap();
        assert_eq!(
            store.get("pendingBarcode").await.unwrap().as_deref(),
            Some(value)
        );
    }
}
