//! Redis-backed key-value store.
//!
//! Uses a `ConnectionManager`: one multiplexed connection that is re-opened
//! after the server drops it, so a Redis restart costs failed cycles instead
//! of a dead runtime.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::config::StoreConfig;
use crate::ports::{KeyValueStore, StoreError};

/// Redis implementation of the `KeyValueStore` port.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    address: String,
}

impl RedisStore {
    /// Open a connection, bounded by the configured connect timeout.
    ///
    /// # Errors
    /// Returns `StoreError::Unreachable` if the URL is invalid, the
    /// connection is refused, or the timeout elapses.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let address = config.address();
        let unreachable_err = |reason: String| StoreError::Unreachable {
            address: address.clone(),
            reason,
        };

        let client = redis::Client::open(config.url()).map_err(|e| unreachable_err(e.to_string()))?;

        let conn = tokio::time::timeout(
            config.connect_timeout(),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| {
            unreachable_err(format!(
                "connection timed out after {}s",
                config.connect_timeout_secs
            ))
        })?
        .map_err(|e| unreachable_err(e.to_string()))?;

        tracing::debug!(address = %address, "Connected to Redis");

        Ok(Self { conn, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| StoreError::Unreachable {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e: redis::RedisError| StoreError::command("GET", e))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e: redis::RedisError| StoreError::command("SET", e))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.exists(key)
            .await
            .map_err(|e: redis::RedisError| StoreError::command("EXISTS", e))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.keys(pattern)
            .await
            .map_err(|e: redis::RedisError| StoreError::command("KEYS", e))
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
