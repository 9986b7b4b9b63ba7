//! Artifact Fetcher Port - byte-fetch capability used to download handler
//! archives.

use async_trait::async_trait;

/// Errors that can occur while fetching an archive
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {reason}")]
    Client { reason: String },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Port for downloading raw bytes
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch the full body at `url`.
    ///
    /// # Errors
    /// Returns `FetchError` on network failure, timeout or a non-success
    /// status
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
