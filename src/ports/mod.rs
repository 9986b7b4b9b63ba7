//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! runtime and the outside world. Adapters implement these ports.
//!
//! - `KeyValueStore` - the store polled for input and written with results
//! - `ArtifactFetcher` - downloads handler archives
//! - `ModuleLoader` - loads a module file and resolves its handler

mod artifact_fetcher;
mod key_value_store;
mod module_loader;

pub use artifact_fetcher::{ArtifactFetcher, FetchError};
pub use key_value_store::{KeyValueStore, StoreError};
pub use module_loader::{LoadError, LoadedModule, ModuleId, ModuleLoader, ResolvedModule};
