//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid store port")]
    InvalidPort,

    #[error("Poll interval must be a positive number of seconds")]
    InvalidPollInterval,

    #[error("Timeout must be a positive number of seconds: {0}")]
    InvalidTimeout(&'static str),

    #[error("Handler locator must look like <module>.<symbol>, got '{0}'")]
    InvalidHandlerLocator(String),

    #[error("Archive URL must use http:// or https://, got '{0}'")]
    InvalidArchiveUrl(String),

    #[error("Invalid log filter directive: {0}")]
    InvalidLogLevel(String),
}
