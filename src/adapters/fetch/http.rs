//! HTTP artifact fetcher backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{ArtifactFetcher, FetchError};

/// Downloads archives over HTTP(S) with a whole-request timeout.
#[derive(Debug, Clone)]
pub struct HttpArtifactFetcher {
    http_client: reqwest::Client,
}

impl HttpArtifactFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns `FetchError::Client` if the HTTP client cannot be built
    /// (e.g. no TLS backend available).
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client { reason: e.to_string() })?;

        Ok(Self { http_client })
    }
}

fn request_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("Fetching artifact from {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Artifact endpoint returned {}", status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| request_error(url, e))?;

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_a_timeout() {
        assert!(HttpArtifactFetcher::new(Duration::from_secs(30)).is_ok());
    }

    #[tokio::test]
    async fn unroutable_host_is_a_request_error() {
        let fetcher = HttpArtifactFetcher::new(Duration::from_secs(2)).unwrap();

        let result = fetcher.fetch("http://127.0.0.1:1/function.zip").await;

        assert!(matches!(
            result,
            Err(FetchError::Request { .. }) | Err(FetchError::Timeout { .. })
        ));
    }
}
