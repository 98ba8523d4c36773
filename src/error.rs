//! Error types for mediavault
//!
//! This module provides the crate's error handling, including:
//! - The crawl taxonomy (validation, conflict, connectivity, domain failure,
//!   not-found, timeout) that the orchestration boundary folds into a uniform
//!   [`CrawlReport`](crate::types::CrawlReport)
//! - Ambient error types (database, I/O, network, serialization)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{CrawlReport, CrawlStatus};

/// Result type alias for mediavault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mediavault
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker.base_url")
        key: Option<String>,
    },

    /// Malformed target reference (unparseable URL, bad short code, missing token)
    #[error("invalid target: {0}")]
    Validation(String),

    /// The remote worker (or this process) already has an active crawl job
    #[error("crawl already running: {0}")]
    Conflict(String),

    /// Transport-level failure reaching the remote worker
    #[error("worker unreachable: {0}")]
    Connectivity(#[from] ConnectivityError),

    /// The remote worker explicitly reported a failed crawl
    #[error("crawl failed: {0}")]
    CrawlFailed(String),

    /// The crawl completed but no matching record was found in the output files
    #[error("no result found: {0}")]
    ResultNotFound(String),

    /// Local wait budget exceeded while the remote job was still running
    #[error("crawl timed out after {budget_secs}s")]
    WaitTimeout {
        /// The wait budget that was exceeded, in seconds
        budget_secs: u64,
    },

    /// Identifier transcoding failed
    #[error("identifier resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// A remote response was missing expected envelope fields.
    ///
    /// This indicates an API contract breach and deliberately propagates as an
    /// unhandled fault instead of folding into a crawl report.
    #[error("malformed worker response: {0}")]
    Envelope(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside the worker taxonomy (media host, lookup API)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored record not found in local storage
    #[error("record not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new crawls
    #[error("shutdown in progress: not accepting new crawls")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Fold a taxonomy error into the uniform crawl report.
    ///
    /// Conflict, validation, connectivity, domain failure, not-found, and
    /// resolution errors become `failed`; a wait timeout becomes `timeout`.
    /// Faults (database, I/O, envelope breaches, ...) are returned unchanged in
    /// `Err` so they propagate to the caller.
    pub fn into_report(self) -> std::result::Result<CrawlReport, Error> {
        match self {
            Error::Validation(_)
            | Error::Conflict(_)
            | Error::Connectivity(_)
            | Error::CrawlFailed(_)
            | Error::ResultNotFound(_)
            | Error::Resolve(_) => Ok(CrawlReport {
                status: CrawlStatus::Failed,
                message: Some(self.to_string()),
                data: None,
            }),
            Error::WaitTimeout { .. } => Ok(CrawlReport {
                status: CrawlStatus::Timeout,
                message: Some(self.to_string()),
                data: None,
            }),
            fault => Err(fault),
        }
    }
}

/// Transport-level failures reaching the remote worker
///
/// Distinct from a domain-level crawl failure: these mean the worker could not
/// be reached at all, not that it ran and failed.
#[derive(Debug, Error)]
pub enum ConnectivityError {
    /// Connection refused or DNS failure
    #[error("connection refused ({url})")]
    Unreachable {
        /// The worker URL that could not be reached
        url: String,
    },

    /// The request timed out at the transport level
    #[error("connection timed out ({url})")]
    Timeout {
        /// The worker URL that timed out
        url: String,
    },

    /// The worker answered with an unexpected HTTP status
    #[error("worker returned HTTP {status} ({url})")]
    Status {
        /// The HTTP status code received
        status: u16,
        /// The worker URL that answered
        url: String,
    },
}

/// Identifier transcoding failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Input does not carry the short-code prefix
    #[error("not a short code: {0}")]
    NotShortCode(String),

    /// Short code has the wrong length
    #[error("short code {code} has length {len}, expected {expected}")]
    BadLength {
        /// The offending short code
        code: String,
        /// Its actual length
        len: usize,
        /// The required length
        expected: usize,
    },

    /// Short code contains a character outside the known alphabet
    #[error("short code {code} contains invalid character '{ch}'")]
    BadAlphabet {
        /// The offending short code
        code: String,
        /// The character outside the alphabet
        ch: char,
    },
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Constraint violation (e.g., duplicate natural key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// API error response format
///
/// Returned by API endpoints when an error occurs, with machine-readable error
/// codes and human-readable messages.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "record not found: BV17x411w7KC"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::ResultNotFound(_) => 404,

            // 409 Conflict - single-flight violated
            Error::Conflict(_) => 409,

            // 422 Unprocessable Entity - semantic errors
            Error::Resolve(_) => 422,

            // 500 Internal Server Error - server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,

            // 502 Bad Gateway - external service errors
            Error::Connectivity(_) => 502,
            Error::CrawlFailed(_) => 502,
            Error::Network(_) => 502,
            Error::Envelope(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 504 Gateway Timeout
            Error::WaitTimeout { .. } => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Conflict(_) => "conflict",
            Error::Connectivity(e) => match e {
                ConnectivityError::Unreachable { .. } => "worker_unreachable",
                ConnectivityError::Timeout { .. } => "worker_timeout",
                ConnectivityError::Status { .. } => "worker_bad_status",
            },
            Error::CrawlFailed(_) => "crawl_failed",
            Error::ResultNotFound(_) => "result_not_found",
            Error::WaitTimeout { .. } => "wait_timeout",
            Error::Resolve(_) => "resolve_error",
            Error::Envelope(_) => "malformed_response",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::WaitTimeout { budget_secs } => Some(serde_json::json!({
                "budget_secs": budget_secs,
            })),
            Error::Connectivity(ConnectivityError::Status { status, url }) => {
                Some(serde_json::json!({
                    "status": status,
                    "url": url,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
