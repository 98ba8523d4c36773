//! Media asset downloading
//!
//! Downloads a single remote binary into local content storage. Failures are
//! reported as `false` and logged with their reason; they never propagate into
//! the caller's control flow, since a missing asset must not abort an
//! ingestion.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Downloads one remote asset to a destination path
///
/// Trait object so ingestion tests can substitute a fake that records calls
/// instead of touching the network.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url` and write the full body to `dest`, creating parent
    /// directories as needed. Returns whether the download succeeded.
    async fn download(&self, url: &str, dest: &Path) -> bool;
}

/// reqwest-backed fetcher with a bounded per-asset timeout
pub struct HttpMediaFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpMediaFetcher {
    /// Create a fetcher using the shared HTTP client
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn download(&self, url: &str, dest: &Path) -> bool {
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url, error = %e, "media download request failed");
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(url, status = response.status().as_u16(), "media download rejected");
            return false;
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(url, error = %e, "media download body read failed");
                return false;
            }
        };

        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(path = %parent.display(), error = %e, "media directory creation failed");
                return false;
            }
        }

        if let Err(e) = tokio::fs::write(dest, &bytes).await {
            tracing::warn!(path = %dest.display(), error = %e, "media write failed");
            return false;
        }

        tracing::debug!(url, path = %dest.display(), size = bytes.len(), "media asset saved");
        true
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn downloads_body_and_creates_parent_dirs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/0.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("xhs/abc123/0.jpg");
        let fetcher = HttpMediaFetcher::new(reqwest::Client::new(), Duration::from_secs(5));

        assert!(fetcher.download(&format!("{}/img/0.jpg", server.uri()), &dest).await);
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpegdata");
    }

    #[tokio::test]
    async fn http_error_reports_failure_without_writing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("gone.jpg");
        let fetcher = HttpMediaFetcher::new(reqwest::Client::new(), Duration::from_secs(5));

        assert!(!fetcher.download(&format!("{}/img/gone.jpg", server.uri()), &dest).await);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn unreachable_host_reports_failure() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("x.jpg");
        let fetcher = HttpMediaFetcher::new(reqwest::Client::new(), Duration::from_secs(1));

        // Port 1 is essentially never listening
        assert!(!fetcher.download("http://127.0.0.1:1/x.jpg", &dest).await);
    }
}
