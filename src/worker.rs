//! Remote crawl-worker client
//!
//! Typed client for the external crawl worker's HTTP API. The worker runs at
//! most one job at a time; this client only observes and drives it, all
//! single-flight enforcement lives in [`crate::vault`].
//!
//! Transport failures are classified into
//! [`ConnectivityError`](crate::error::ConnectivityError) variants so callers
//! can distinguish "worker unreachable" from a domain-level crawl failure.

use serde::{Deserialize, Serialize};

use crate::config::WorkerConfig;
use crate::error::{ConnectivityError, Error, Result};
use crate::types::{DataFile, Platform, WorkerLogEntry, WorkerStatus};

/// Payload for the worker's start endpoint
#[derive(Clone, Debug, Serialize)]
pub struct CrawlJob {
    /// Target platform identifier
    pub platform: String,
    /// Login mode the worker should use
    pub login_type: String,
    /// Crawl mode; this core only requests detail crawls
    pub crawler_type: String,
    /// The identifier or URL the worker should fetch
    pub specified_ids: String,
    /// Whether to also collect comments
    pub enable_comments: bool,
    /// Output format; result files are JSON envelopes
    pub save_option: String,
    /// Run the worker's browser headless
    pub headless: bool,
}

impl CrawlJob {
    /// Build a detail-crawl job for the given platform and target id/URL
    pub fn detail(platform: Platform, specified_ids: String, enable_comments: bool) -> Self {
        Self {
            platform: platform.as_str().to_string(),
            login_type: "qrcode".to_string(),
            crawler_type: "detail".to_string(),
            specified_ids,
            enable_comments,
            save_option: "json".to_string(),
            headless: true,
        }
    }
}

/// Result-file envelope: every output file wraps its records in `{data, total}`
#[derive(Clone, Debug, Deserialize)]
pub struct ResultEnvelope {
    /// The records in this file
    pub data: Vec<serde_json::Value>,
    /// Record count as reported by the worker
    #[allow(dead_code)]
    pub total: i64,
}

/// Outcome of a connectivity probe
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ConnectionCheck {
    /// Whether the worker answered at all
    pub connected: bool,
    /// The worker URL probed
    pub url: String,
    /// Worker status when connected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkerStatus>,
    /// Failure detail when not connected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogsEnvelope {
    #[serde(default)]
    logs: Vec<WorkerLogEntry>,
}

#[derive(Debug, Deserialize)]
struct FilesEnvelope {
    #[serde(default)]
    files: Vec<DataFile>,
}

#[derive(Debug, Deserialize)]
struct BusyDetail {
    #[serde(default)]
    detail: Option<String>,
}

/// HTTP client for the remote crawl worker
pub struct WorkerClient {
    client: reqwest::Client,
    base_url: String,
    log_limit: u32,
}

impl WorkerClient {
    /// Create a client from configuration, sharing the process-wide reqwest client
    pub fn new(client: reqwest::Client, config: &WorkerConfig) -> Self {
        Self {
            client,
            base_url: config.normalized_url(),
            log_limit: config.log_limit,
        }
    }

    /// The normalized worker base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a reqwest transport error to the connectivity taxonomy
    fn classify(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Connectivity(ConnectivityError::Timeout {
                url: self.base_url.clone(),
            })
        } else {
            Error::Connectivity(ConnectivityError::Unreachable {
                url: self.base_url.clone(),
            })
        }
    }

    fn bad_status(&self, status: u16) -> Error {
        Error::Connectivity(ConnectivityError::Status {
            status,
            url: self.base_url.clone(),
        })
    }

    /// GET /crawler/status - current worker state
    pub async fn status(&self) -> Result<WorkerStatus> {
        let response = self
            .client
            .get(self.endpoint("/crawler/status"))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(self.bad_status(response.status().as_u16()));
        }

        response
            .json::<WorkerStatus>()
            .await
            .map_err(|e| Error::Envelope(format!("crawler status: {}", e)))
    }

    /// Probe the worker and report connectivity without raising
    pub async fn check_connection(&self) -> ConnectionCheck {
        match self.status().await {
            Ok(status) => ConnectionCheck {
                connected: true,
                url: self.base_url.clone(),
                status: Some(status),
                error: None,
            },
            Err(e) => ConnectionCheck {
                connected: false,
                url: self.base_url.clone(),
                status: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// POST /crawler/start - submit a job.
    ///
    /// A busy worker (HTTP 400/409 with a detail message) surfaces as
    /// [`Error::Conflict`]; transport failures as connectivity errors.
    pub async fn start_crawl(&self, job: &CrawlJob) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("/crawler/start"))
            .json(job)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 409 {
            let detail = response
                .json::<BusyDetail>()
                .await
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or_else(|| "crawler is busy with another job".to_string());
            return Err(Error::Conflict(detail));
        }
        if !status.is_success() {
            return Err(self.bad_status(status.as_u16()));
        }

        tracing::info!(platform = %job.platform, target = %job.specified_ids, "crawl job started");
        Ok(())
    }

    /// POST /crawler/stop - best-effort stop of the active job
    pub async fn stop(&self) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("/crawler/stop"))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(self.bad_status(response.status().as_u16()));
        }
        Ok(())
    }

    /// GET /crawler/logs?limit=N - recent worker log lines, newest-relevant first
    pub async fn logs(&self, limit: u32) -> Result<Vec<WorkerLogEntry>> {
        let response = self
            .client
            .get(self.endpoint("/crawler/logs"))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(self.bad_status(response.status().as_u16()));
        }

        let envelope = response
            .json::<LogsEnvelope>()
            .await
            .map_err(|e| Error::Envelope(format!("crawler logs: {}", e)))?;
        Ok(envelope.logs)
    }

    /// Recent logs at the configured enrichment limit
    pub async fn recent_logs(&self) -> Result<Vec<WorkerLogEntry>> {
        self.logs(self.log_limit).await
    }

    /// GET /data/files?platform=P - list result files for a platform
    pub async fn data_files(&self, platform: Platform) -> Result<Vec<DataFile>> {
        let response = self
            .client
            .get(self.endpoint("/data/files"))
            .query(&[("platform", platform.as_str())])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(self.bad_status(response.status().as_u16()));
        }

        let envelope = response
            .json::<FilesEnvelope>()
            .await
            .map_err(|e| Error::Envelope(format!("data files: {}", e)))?;
        Ok(envelope.files)
    }

    /// GET /data/files/{path} - fetch one result file's envelope.
    ///
    /// A response without the `{data, total}` shape is an API contract breach
    /// and propagates as [`Error::Envelope`].
    pub async fn file_content(&self, path: &str) -> Result<ResultEnvelope> {
        let response = self
            .client
            .get(self.endpoint(&format!("/data/files/{}", path)))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(self.bad_status(response.status().as_u16()));
        }

        response
            .json::<ResultEnvelope>()
            .await
            .map_err(|e| Error::Envelope(format!("result file {}: {}", path, e)))
    }
}
