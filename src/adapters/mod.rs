//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the runtime to external systems:
//! - `store` - Key-value stores (Redis, in-memory)
//! - `fetch` - Archive download (HTTP, static)
//! - `loader` - Handler loading (dynamic library, registry)

pub mod fetch;
pub mod loader;
pub mod store;

pub use fetch::{HttpArtifactFetcher, StaticArtifactFetcher};
pub use loader::{DylibModuleLoader, HandlerRegistry, RegistryModuleLoader};
pub use store::{InMemoryStore, RedisStore};
