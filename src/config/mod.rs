//! Runtime configuration module
//!
//! Configuration is read once at startup from environment variables (and a
//! `.env` file when present) using the `config` and `dotenvy` crates, then
//! validated into an immutable [`RuntimeConfig`] that is passed down to every
//! component. Nothing below `main` reads the environment again.
//!
//! # Environment Variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `REDIS_HOST` | `localhost` |
//! | `REDIS_PORT` | `6379` |
//! | `REDIS_INPUT_KEY` | `metrics` |
//! | `REDIS_OUTPUT_KEY` | `output` |
//! | `REDIS_CONNECT_TIMEOUT` | `10` |
//! | `MONITORING_PERIOD` | `5` |
//! | `HANDLER_FUNCTION` | `handler_module.handler` |
//! | `ZIP_URL` | unset |
//! | `ZIP_FETCH_TIMEOUT` | `30` |
//! | `HANDLER_FILE_PATH` | `/app/function/handler.so` |
//! | `LOG_LEVEL` | `info,kv_function_runtime=debug` |
//! | `LOG_FORMAT` | `pretty` |
//!
//! # Example
//!
//! ```no_run
//! use kv_function_runtime::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::load().expect("Failed to load configuration");
//! println!("Polling {} every {:?}", config.store().input_key, config.poll_interval());
//! ```

mod error;
mod handler;
mod logging;
mod store;

pub use error::{ConfigError, ValidationError};
pub use handler::{ArtifactSource, HandlerLocator};
pub use logging::{LogFormat, LoggingConfig};
pub use store::StoreConfig;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Raw settings as they appear in the environment.
///
/// Field names are the lowercased variable names. Convert into a
/// [`RuntimeConfig`] with `try_into()`, which validates every value.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default = "store::default_host")]
    pub redis_host: String,

    #[serde(default = "store::default_port")]
    pub redis_port: u16,

    #[serde(default = "store::default_input_key")]
    pub redis_input_key: String,

    #[serde(default = "store::default_output_key")]
    pub redis_output_key: String,

    #[serde(default = "store::default_connect_timeout")]
    pub redis_connect_timeout: u64,

    /// Poll interval in seconds
    #[serde(default = "default_monitoring_period")]
    pub monitoring_period: u64,

    #[serde(default = "default_handler_function")]
    pub handler_function: String,

    #[serde(default)]
    pub zip_url: Option<String>,

    #[serde(default = "default_fetch_timeout")]
    pub zip_fetch_timeout: u64,

    #[serde(default = "default_handler_file_path")]
    pub handler_file_path: PathBuf,

    #[serde(default = "logging::default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            redis_host: store::default_host(),
            redis_port: store::default_port(),
            redis_input_key: store::default_input_key(),
            redis_output_key: store::default_output_key(),
            redis_connect_timeout: store::default_connect_timeout(),
            monitoring_period: default_monitoring_period(),
            handler_function: default_handler_function(),
            zip_url: None,
            zip_fetch_timeout: default_fetch_timeout(),
            handler_file_path: default_handler_file_path(),
            log_level: logging::default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_monitoring_period() -> u64 {
    5
}

fn default_handler_function() -> String {
    "handler_module.handler".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_handler_file_path() -> PathBuf {
    PathBuf::from("/app/function/handler.so")
}

/// Immutable runtime configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    store: StoreConfig,
    handler: HandlerLocator,
    artifact: ArtifactSource,
    poll_interval: Duration,
    fetch_timeout: Duration,
    logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables (see module docs for names)
    /// 3. Deserializes and validates them
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value cannot be parsed or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(config::Environment::default())
    }

    /// Load configuration from an explicit variable map instead of the
    /// process environment.
    pub fn load_from(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(config::Environment::default().source(Some(vars.into_iter().collect())))
    }

    fn build(source: config::Environment) -> Result<Self, ConfigError> {
        let settings: RuntimeSettings = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        Ok(settings.try_into()?)
    }

    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    pub fn handler(&self) -> &HandlerLocator {
        &self.handler
    }

    pub fn artifact(&self) -> &ArtifactSource {
        &self.artifact
    }

    /// Sleep between two cycles.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Timeout applied to the archive download.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }
}

impl TryFrom<RuntimeSettings> for RuntimeConfig {
    type Error = ValidationError;

    fn try_from(settings: RuntimeSettings) -> Result<Self, Self::Error> {
        let store = StoreConfig {
            host: settings.redis_host,
            port: settings.redis_port,
            input_key: settings.redis_input_key,
            output_key: settings.redis_output_key,
            connect_timeout_secs: settings.redis_connect_timeout,
        };
        store.validate()?;

        if settings.monitoring_period == 0 {
            return Err(ValidationError::InvalidPollInterval);
        }
        if settings.zip_fetch_timeout == 0 {
            return Err(ValidationError::InvalidTimeout("ZIP_FETCH_TIMEOUT"));
        }

        let handler = settings.handler_function.parse::<HandlerLocator>()?;
        let artifact =
            ArtifactSource::resolve(settings.zip_url.as_deref(), settings.handler_file_path)?;

        let logging = LoggingConfig {
            level: settings.log_level,
            format: settings.log_format,
        };
        logging.validate()?;

        Ok(Self {
            store,
            handler,
            artifact,
            poll_interval: Duration::from_secs(settings.monitoring_period),
            fetch_timeout: Duration::from_secs(settings.zip_fetch_timeout),
            logging,
        })
    }
}
