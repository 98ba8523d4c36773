//! Core types for mediavault

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Platform a crawl targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Image/text post platform (natural key: note id)
    Xhs,
    /// Video platform (natural key: numeric avid, alternate key: BV short code)
    Bili,
}

impl Platform {
    /// Platform identifier as used by the crawl worker API and in storage paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Xhs => "xhs",
            Platform::Bili => "bili",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xhs" => Ok(Platform::Xhs),
            "bili" | "bilibili" => Ok(Platform::Bili),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Unique identifier for a persisted entity row (post or video)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for RecordId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for RecordId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for RecordId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// State of the remote crawl worker, as reported by its status endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// No job active; a new crawl may be started
    Idle,
    /// A job is running; the worker accepts no further jobs
    Running,
    /// The last job failed; details in `error_message`
    Error,
}

/// Status report from the remote crawl worker
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct WorkerStatus {
    /// Current worker state
    pub status: WorkerState,
    /// Failure detail, present when `status` is `error`
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One line of remote worker log output
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct WorkerLogEntry {
    /// Log level as reported by the worker ("info", "error", ...)
    #[serde(default)]
    pub level: String,
    /// Log message text
    #[serde(default)]
    pub message: String,
}

/// A result file listed by the worker's data-file endpoint
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct DataFile {
    /// Bare file name (used for content classification)
    pub name: String,
    /// Worker-relative path used to fetch the file's content
    pub path: String,
    /// Modification time as a unix timestamp (worker reports fractional seconds)
    #[serde(default)]
    pub modified_at: f64,
}

/// A crawl request, created per invocation and never persisted
#[derive(Clone, Debug)]
pub struct CrawlRequest {
    /// Target platform
    pub platform: Platform,
    /// The reference the caller submitted (full URL or bare identifier)
    pub target_reference: String,
    /// Whether the worker should also collect comments
    pub include_comments: bool,
}

/// Final status of a submit operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    /// Record located and ingested (or already present)
    Completed,
    /// Crawl or ingestion failed; see `message`
    Failed,
    /// Local wait budget exceeded while the worker was still running
    Timeout,
}

/// Summary of a completed ingestion, returned to the caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngestSummary {
    /// Natural key of the persisted entity (note id, or avid for videos)
    pub natural_key: String,
    /// Alternate key when one exists (BV short code)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_key: Option<String>,
    /// Entity title
    pub title: String,
    /// True when the entity already existed and nothing was written
    pub existing: bool,
    /// Relative local paths of media assets persisted by this ingestion
    #[serde(default)]
    pub media_paths: Vec<String>,
}

/// Uniform result of a submit operation
///
/// Every taxonomy error is folded into this shape at the orchestration
/// boundary; only contract-breach faults escape it.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CrawlReport {
    /// Final status
    pub status: CrawlStatus,
    /// Human-readable detail, present for failed/timeout outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Ingestion summary, present for completed outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<IngestSummary>,
}

impl CrawlReport {
    /// Build a completed report from an ingestion summary
    pub fn completed(data: IngestSummary) -> Self {
        Self {
            status: CrawlStatus::Completed,
            message: None,
            data: Some(data),
        }
    }

    /// Build a failed report with a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: CrawlStatus::Failed,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Build a timeout report with a message
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            status: CrawlStatus::Timeout,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Events emitted on the vault's broadcast channel
///
/// Consumers subscribe via [`crate::MediaVault::subscribe`]; the SSE API route
/// forwards these to HTTP clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A crawl job was accepted by the remote worker
    CrawlStarted {
        /// Target platform
        platform: Platform,
        /// The submitted target reference
        target: String,
    },
    /// A crawl completed and its record was ingested
    CrawlCompleted {
        /// Target platform
        platform: Platform,
        /// Natural key of the ingested entity
        natural_key: String,
        /// Whether the entity already existed locally
        existing: bool,
    },
    /// A crawl failed (domain failure, no matching record, or connectivity)
    CrawlFailed {
        /// Target platform
        platform: Platform,
        /// The submitted target reference
        target: String,
        /// Failure detail
        message: String,
    },
    /// The local wait budget was exceeded while the worker kept running
    CrawlTimedOut {
        /// Target platform
        platform: Platform,
        /// The submitted target reference
        target: String,
    },
    /// A media asset download failed; the ingestion continued without it
    MediaFailed {
        /// Target platform
        platform: Platform,
        /// Natural key of the parent entity
        natural_key: String,
        /// Zero-based index of the failed asset
        index: i64,
        /// Source URL that could not be fetched
        url: String,
    },
}
