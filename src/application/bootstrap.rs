//! Startup wiring.
//!
//! Builds everything the polling loop needs, in order: store connection and
//! check, artifact resolution, module loading. Any failure here is fatal and
//! reported as a [`StartupError`]; nothing is retried.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use super::artifact_loader::{Artifact, ArtifactError, ArtifactLoader, UnpackError};
use super::polling_loop::{PollingLoop, RunStats};
use crate::adapters::{DylibModuleLoader, HttpArtifactFetcher, RedisStore};
use crate::config::{ConfigError, RuntimeConfig};
use crate::ports::{ArtifactFetcher, FetchError, KeyValueStore, LoadError, ModuleLoader, StoreError};

/// Fatal errors before the polling loop starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot reach key-value store: {0}")]
    Connect(#[source] StoreError),

    #[error("Failed to download handler archive: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to unpack handler archive: {0}")]
    Unpack(#[from] UnpackError),

    #[error("Module '{module}' not found under {searched}")]
    ModuleNotFound { module: String, searched: String },

    #[error("Handler '{symbol}' not found in module '{module}'")]
    HandlerNotFound { module: String, symbol: String },

    #[error("Failed to load handler module: {0}")]
    Load(#[source] LoadError),
}

impl From<ArtifactError> for StartupError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Fetch(e) => Self::Fetch(e),
            ArtifactError::Unpack(e) => Self::Unpack(e),
            ArtifactError::ModuleNotFound { module, searched } => Self::ModuleNotFound {
                module,
                searched: searched.display().to_string(),
            },
        }
    }
}

impl From<LoadError> for StartupError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::HandlerNotFound { module, symbol } => Self::HandlerNotFound { module, symbol },
            other => Self::Load(other),
        }
    }
}

/// Assembles a [`Runtime`], defaulting to Redis, HTTP and dynamic-library
/// adapters for anything not supplied.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    fetcher: Option<Arc<dyn ArtifactFetcher>>,
    loader: Option<Arc<dyn ModuleLoader>>,
}

impl RuntimeBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            store: None,
            fetcher: None,
            loader: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub async fn build(self) -> Result<Runtime, StartupError> {
        let config = self.config;

        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(
                RedisStore::connect(config.store())
                    .await
                    .map_err(StartupError::Connect)?,
            ),
        };
        check_store(store.as_ref(), &config).await?;

        let fetcher: Arc<dyn ArtifactFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpArtifactFetcher::new(config.fetch_timeout())?),
        };
        let resolved = ArtifactLoader::new(fetcher)
            .resolve(config.artifact(), config.handler())
            .await?;

        let loader: Arc<dyn ModuleLoader> = match self.loader {
            Some(loader) => loader,
            None => Arc::new(DylibModuleLoader::new()),
        };
        let loaded = loader.load(&resolved)?;
        let artifact = Artifact::new(resolved, loaded);
        tracing::info!(
            module_id = %artifact.id(),
            path = %artifact.path().display(),
            handler = %config.handler(),
            "Handler loaded"
        );

        let polling_loop = PollingLoop::new(store, artifact, &config);
        Ok(Runtime { config, polling_loop })
    }
}

async fn check_store(store: &dyn KeyValueStore, config: &RuntimeConfig) -> Result<(), StartupError> {
    store.ping().await.map_err(StartupError::Connect)?;
    tracing::info!(address = %config.store().address(), "Connected to key-value store");

    let input_key = &config.store().input_key;
    let present = store.exists(input_key).await.map_err(StartupError::Connect)?;
    if !present {
        tracing::warn!(key = %input_key, "Input key does not exist yet");
    } else {
        tracing::info!(key = %input_key, "Input key present");
    }
    Ok(())
}

/// A fully wired runtime, ready to poll.
pub struct Runtime {
    config: RuntimeConfig,
    polling_loop: PollingLoop,
}

impl Runtime {
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn polling_loop(&self) -> &PollingLoop {
        &self.polling_loop
    }

    pub fn polling_loop_mut(&mut self) -> &mut PollingLoop {
        &mut self.polling_loop
    }

    /// Poll until shutdown. The artifact, including any scratch directory,
    /// is released when this returns.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) -> RunStats {
        self.polling_loop.run(shutdown).await
    }
}
