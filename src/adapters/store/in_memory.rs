//! In-Memory Key-Value Store Adapter
//!
//! Keeps keys in a map behind a lock and counts every operation, so tests
//! can assert how often the polling loop touches the store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{KeyValueStore, StoreError};

/// In-memory store for testing and embedding
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a value directly, bypassing the operation counters.
    pub async fn insert(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.write().await.insert(key.into(), value.into());
    }

    /// Remove a key directly.
    pub async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Read a value directly, bypassing the operation counters.
    pub async fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Make every operation fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls served so far
    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    fn check_available(&self, command: &'static str) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::command(command, "store marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable {
                address: "in-memory".to_string(),
                reason: "store marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_available("GET")?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check_available("SET")?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.check_available("EXISTS")?;
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.check_available("KEYS")?;
        let matcher = glob::Pattern::new(pattern).map_err(|e| StoreError::command("KEYS", e))?;
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = InMemoryStore::new();

        store.set("output", b"{\"a\":1}").await.unwrap();
        let value = store.get("output").await.unwrap();

        assert_eq!(value.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(store.get_count(), 1);
        assert_eq!(store.set_count(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("metrics").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_direct_helpers_do_not_count() {
        let store = InMemoryStore::new();
        store.insert("metrics", "{}").await;

        assert_eq!(store.value("metrics").await, Some(b"{}".to_vec()));
        assert_eq!(store.get_count(), 0);
        assert_eq!(store.set_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_everything() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        assert!(matches!(store.ping().await, Err(StoreError::Unreachable { .. })));
        assert!(store.get("metrics").await.is_err());
        assert!(store.set("output", b"{}").await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_keys_pattern() {
        let store = InMemoryStore::new();
        store.insert("metrics", "{}").await;
        store.insert("metrics-old", "{}").await;
        store.insert("output", "{}").await;

        assert_eq!(store.keys("metrics").await.unwrap(), vec!["metrics"]);
        assert_eq!(
            store.keys("metrics*").await.unwrap(),
            vec!["metrics", "metrics-old"]
        );
        assert_eq!(store.keys("*").await.unwrap().len(), 3);
        assert_eq!(store.keys("outpu?").await.unwrap(), vec!["output"]);
    }

    #[tokio::test]
    async fn test_keys_character_class() {
        let store = InMemoryStore::new();
        store.insert("metrics", "{}").await;
        store.insert("metricz", "{}").await;

        assert_eq!(store.keys("metric[s]").await.unwrap(), vec!["metrics"]);
        assert_eq!(store.keys("metric[!s]").await.unwrap(), vec!["metricz"]);
        assert!(matches!(
            store.keys("metric[").await,
            Err(StoreError::CommandFailed { command: "KEYS", .. })
        ));
    }

    #[tokio::test]
    async fn test_exists_takes_key_literally() {
        let store = InMemoryStore::new();
        store.insert("metrics*", "{}").await;
        store.insert("host?", "{}").await;

        assert!(store.exists("metrics*").await.unwrap());
        assert!(store.exists("host?").await.unwrap());
        assert!(!store.exists("metrics").await.unwrap());
        assert!(!store.exists("hosts").await.unwrap());
    }
}
