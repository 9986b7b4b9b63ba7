//! Key-Value Store Port - Interface to the store used as input queue and
//! output sink.
//!
//! The runtime only needs plain reads, overwriting writes and key listing;
//! no transactions, TTLs or pub/sub.

use async_trait::async_trait;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unreachable at {address}: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("Store command {command} failed: {reason}")]
    CommandFailed {
        command: &'static str,
        reason: String,
    },
}

impl StoreError {
    pub fn command(command: &'static str, reason: impl ToString) -> Self {
        Self::CommandFailed {
            command,
            reason: reason.to_string(),
        }
    }
}

/// Port for reading and writing keys in the external store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Check that the store answers.
    ///
    /// # Errors
    /// Returns `StoreError` if the store cannot be reached
    async fn ping(&self) -> Result<(), StoreError>;

    /// Read the raw value at `key`.
    ///
    /// # Returns
    /// `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Overwrite the value at `key`.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Whether `key` exists. Unlike `keys`, the name is taken literally.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// List keys matching a glob-style pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_unreachable() {
        let err = StoreError::Unreachable {
            address: "localhost:6379".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("localhost:6379"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_store_error_command() {
        let err = StoreError::command("GET", "broken pipe");
        assert_eq!(err.to_string(), "Store command GET failed: broken pipe");
    }
}
