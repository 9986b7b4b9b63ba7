//! Result Publisher - writes handler results to the output key.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::ports::{KeyValueStore, StoreError};

/// Errors that can occur while publishing a result
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What was written, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    pub keys: usize,
    pub bytes: usize,
}

/// Serializes result mappings and overwrites the output key with them.
pub struct ResultPublisher {
    store: Arc<dyn KeyValueStore>,
    output_key: String,
}

impl ResultPublisher {
    pub fn new(store: Arc<dyn KeyValueStore>, output_key: impl Into<String>) -> Self {
        Self {
            store,
            output_key: output_key.into(),
        }
    }

    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// Serialize `body` as compact JSON (keys sorted) and SET it.
    pub async fn publish(&self, body: &Map<String, Value>) -> Result<PublishReceipt, PublishError> {
        let bytes = serde_json::to_vec(body)?;
        self.store.set(&self.output_key, &bytes).await?;

        Ok(PublishReceipt {
            keys: body.len(),
            bytes: bytes.len(),
        })
    }
}
