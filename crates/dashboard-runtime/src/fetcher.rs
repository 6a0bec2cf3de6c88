//! Where the CSV export comes from.
//!
//! [`SourceFetcher`] is the seam between the cache and the outside world: the
//! production binary uses [`HttpFetcher`] against the published sheet, local
//! runs and tests use [`FileFetcher`] or a scripted fetcher.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use dashboard_core::error::{DashboardError, Result};
use tracing::debug;

/// Produces the raw CSV text of the contract sheet.
pub trait SourceFetcher: Send + Sync {
    /// Download (or read) the full export.
    fn fetch(&self) -> impl Future<Output = Result<String>> + Send;

    /// Human-readable location, used in logs and error messages.
    fn describe(&self) -> &str;
}

// ── HTTP ──────────────────────────────────────────────────────────────────────

/// Fetches the export over HTTP(S) with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("prodepa-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DashboardError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    fn fetch_error(&self, err: reqwest::Error) -> DashboardError {
        let reason = if err.is_timeout() {
            format!("timed out after {}s", self.timeout.as_secs())
        } else if let Some(status) = err.status() {
            format!("server answered {status}")
        } else {
            err.to_string()
        };
        DashboardError::Fetch {
            source_url: self.url.clone(),
            reason,
        }
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<String> {
        debug!("GET {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.fetch_error(e))?;
        let body = response.text().await.map_err(|e| self.fetch_error(e))?;
        debug!("Downloaded {} bytes from {}", body.len(), self.url);
        Ok(body)
    }

    fn describe(&self) -> &str {
        &self.url
    }
}

// ── Local file ────────────────────────────────────────────────────────────────

/// Reads the export from a local CSV file.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    path: PathBuf,
    label: String,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }
}

impl SourceFetcher for FileFetcher {
    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DashboardError::Fetch {
                source_url: self.label.clone(),
                reason: e.to_string(),
            })
    }

    fn describe(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;

    const CSV: &str = "STATUS,SERVICO\nAtivo,Voz\n";

    #[tokio::test]
    async fn test_http_fetch_ok() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/pub");
                then.status(200)
                    .header("content-type", "text/csv; charset=utf-8")
                    .body(CSV);
            })
            .await;

        let fetcher = HttpFetcher::new(server.url("/pub"), Duration::from_secs(5)).unwrap();
        let body = fetcher.fetch().await.unwrap();

        assert_eq!(body, CSV);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_fetch_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pub");
                then.status(503);
            })
            .await;

        let url = server.url("/pub");
        let fetcher = HttpFetcher::new(url.clone(), Duration::from_secs(5)).unwrap();
        match fetcher.fetch().await.unwrap_err() {
            DashboardError::Fetch { source_url, reason } => {
                assert_eq!(source_url, url);
                assert!(reason.contains("503"), "reason = {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_fetch_unreachable() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let fetcher = HttpFetcher::new("http://127.0.0.1:9/pub", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            fetcher.fetch().await,
            Err(DashboardError::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_file_fetch_ok() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let fetcher = FileFetcher::new(file.path());
        assert_eq!(fetcher.fetch().await.unwrap(), CSV);
        assert_eq!(fetcher.describe(), file.path().display().to_string());
    }

    #[tokio::test]
    async fn test_file_fetch_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let fetcher = FileFetcher::new(dir.path().join("missing.csv"));
        assert!(matches!(
            fetcher.fetch().await,
            Err(DashboardError::Fetch { .. })
        ));
    }
}
