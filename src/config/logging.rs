//! Logging configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Tracing filter directive, used when `RUST_LOG` is not set
    pub level: String,

    /// Human-readable or JSON lines
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Reject directives the tracing filter would not parse, so a typo in
    /// `LOG_LEVEL` fails startup instead of silently logging at `info`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.level.trim().is_empty() {
            return Err(ValidationError::InvalidLogLevel(self.level.clone()));
        }
        tracing_subscriber::EnvFilter::try_new(&self.level)
            .map_err(|e| ValidationError::InvalidLogLevel(format!("{}: {}", self.level, e)))?;
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

pub(super) fn default_log_level() -> String {
    "info,kv_function_runtime=debug".to_string()
}
