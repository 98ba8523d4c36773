//! Configuration types for mediavault

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Remote crawl-worker connection settings
///
/// Groups everything related to reaching the external worker and pacing the
/// completion poll. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkerConfig {
    /// Base URL of the crawl worker (default: "http://127.0.0.1:8080").
    ///
    /// A bare `host:port` is accepted; an `http://` prefix is added when no
    /// scheme is present.
    #[serde(default = "default_worker_url")]
    pub base_url: String,

    /// Transport connect timeout (default: 5 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Per-request timeout (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Interval between completion polls (default: 2 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Default wait budget for `wait_for_completion` (default: 90 seconds)
    #[serde(default = "default_wait_budget", with = "duration_serde")]
    pub wait_budget: Duration,

    /// Number of log lines fetched when enriching failure messages (default: 30)
    #[serde(default = "default_log_limit")]
    pub log_limit: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            base_url: default_worker_url(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            poll_interval: default_poll_interval(),
            wait_budget: default_wait_budget(),
            log_limit: default_log_limit(),
        }
    }
}

impl WorkerConfig {
    /// Base URL with a scheme, adding `http://` when the configured value has none
    pub fn normalized_url(&self) -> String {
        let url = self.base_url.trim_end_matches('/');
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        }
    }
}

/// Local storage settings (database and media directory)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// SQLite database path (default: "./data/mediavault.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Root directory for downloaded media assets (default: "./data").
    ///
    /// Asset paths recorded in the database are relative to this directory.
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            media_dir: default_media_dir(),
        }
    }
}

/// Identifier-resolution settings (authoritative lookup endpoint)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolverConfig {
    /// Authoritative short-code lookup endpoint (None disables the lookup and
    /// the local transform is used alone)
    #[serde(default = "default_lookup_url")]
    pub lookup_url: Option<String>,

    /// Timeout for the authoritative lookup (default: 10 seconds)
    #[serde(default = "default_lookup_timeout", with = "duration_serde")]
    pub lookup_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookup_url: default_lookup_url(),
            lookup_timeout: default_lookup_timeout(),
        }
    }
}

/// Media download settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Per-asset download timeout (default: 30 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            download_timeout: default_download_timeout(),
        }
    }
}

/// REST API server settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Bind address (default: 127.0.0.1:8590)
    #[serde(default = "default_bind_addr")]
    #[schema(value_type = String)]
    pub bind_addr: SocketAddr,

    /// Serve the interactive Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub enable_swagger_ui: bool,

    /// Allowed CORS origins; empty list allows any origin (default: empty)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_swagger_ui: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Main configuration for [`MediaVault`](crate::MediaVault)
///
/// Fields are organized into logical sub-configs:
/// - [`worker`](WorkerConfig) — remote worker URL, timeouts, poll pacing
/// - [`storage`](StorageConfig) — database path, media directory
/// - [`resolver`](ResolverConfig) — authoritative id lookup
/// - [`fetch`](FetchConfig) — media download timeouts
/// - [`api`](ApiConfig) — REST API server
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Remote crawl-worker settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Identifier-resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Media download settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// REST API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_worker_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_wait_budget() -> Duration {
    Duration::from_secs(90)
}

fn default_log_limit() -> u32 {
    30
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/mediavault.db")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_lookup_url() -> Option<String> {
    Some("https://api.bilibili.com/x/web-interface/view".to_string())
}

fn default_lookup_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_bind_addr() -> SocketAddr {
    use std::net::{IpAddr, Ipv4Addr};
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8590)
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (seconds as integers)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_pacing() {
        let config = Config::default();
        assert_eq!(config.worker.poll_interval, Duration::from_secs(2));
        assert_eq!(config.worker.wait_budget, Duration::from_secs(90));
        assert_eq!(config.fetch.download_timeout, Duration::from_secs(30));
    }

    #[test]
    fn bare_host_gets_http_prefix() {
        let worker = WorkerConfig {
            base_url: "crawler.local:8080".into(),
            ..Default::default()
        };
        assert_eq!(worker.normalized_url(), "http://crawler.local:8080");

        let worker = WorkerConfig {
            base_url: "https://crawler.local/".into(),
            ..Default::default()
        };
        assert_eq!(worker.normalized_url(), "https://crawler.local");
    }

    #[test]
    fn config_deserializes_from_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"worker": {"base_url": "worker:9000", "wait_budget": 30}}"#)
                .unwrap();
        assert_eq!(config.worker.base_url, "worker:9000");
        assert_eq!(config.worker.wait_budget, Duration::from_secs(30));
        assert_eq!(config.worker.poll_interval, Duration::from_secs(2));
    }
}
