//! Artifact fetcher adapters.
//!
//! - `HttpArtifactFetcher` - reqwest client with a request timeout
//! - `StaticArtifactFetcher` - fixed in-memory bodies for tests

mod http;
mod static_bytes;

pub use http::HttpArtifactFetcher;
pub use static_bytes::StaticArtifactFetcher;
