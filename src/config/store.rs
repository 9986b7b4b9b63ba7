//! Key-value store configuration

use std::time::Duration;

use super::error::ValidationError;

/// Connection and key settings for the key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store host name or address
    pub host: String,

    /// Store port
    pub port: u16,

    /// Key polled for input payloads
    pub input_key: String,

    /// Key the handler result is written to
    pub output_key: String,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl StoreConfig {
    /// Connection URL understood by the Redis client.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    /// `host:port`, for log lines.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate store configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_HOST"));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.input_key.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_INPUT_KEY"));
        }
        if self.output_key.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_OUTPUT_KEY"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("REDIS_CONNECT_TIMEOUT"));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            input_key: default_input_key(),
            output_key: default_output_key(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

pub(super) fn default_host() -> String {
    "localhost".to_string()
}

pub(super) fn default_port() -> u16 {
    6379
}

pub(super) fn default_input_key() -> String {
    "metrics".to_string()
}

pub(super) fn default_output_key() -> String {
    "output".to_string()
}

pub(super) fn default_connect_timeout() -> u64 {
    10
}
