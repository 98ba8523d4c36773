//! # mediavault
//!
//! Media-crawl orchestration library: drives an external, single-concurrency
//! crawl worker to fetch third-party post/video metadata, locates the matching
//! record in the worker's file-based output, and ingests it together with its
//! media assets into local SQLite storage.
//!
//! ## Design Philosophy
//!
//! mediavault is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Explicitly constructed** - One [`MediaVault`] built at startup and
//!   passed by reference; no global state
//! - **Single-flight** - The remote worker accepts one job; the whole
//!   submit→ingest sequence runs under a process-wide exclusive section
//! - **Event-driven** - Consumers subscribe to crawl events, no polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use mediavault::{Config, CrawlRequest, MediaVault, Platform};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.worker.base_url = "http://127.0.0.1:8080".to_string();
//!
//!     let vault = MediaVault::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = vault.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = vault
//!         .submit(CrawlRequest {
//!             platform: Platform::Bili,
//!             target_reference: "BV17x411w7KC".to_string(),
//!             include_comments: false,
//!         })
//!         .await?;
//!     println!("{:?}", report.status);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Media asset downloading
pub mod fetcher;
/// Ingestion pipeline (record mapping, dedup, asset downloads)
pub mod ingest;
/// Result-file location and classification
pub mod locator;
/// Short-code to numeric-id transcoding
pub mod resolver;
/// Target-reference parsing
pub mod target;
/// Core types and events
pub mod types;
/// Crawl lifecycle coordination
pub mod vault;
/// Remote crawl-worker client
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fetcher::{HttpMediaFetcher, MediaFetcher};
pub use types::{
    CrawlReport, CrawlRequest, CrawlStatus, Event, IngestSummary, Platform, RecordId, WorkerState,
    WorkerStatus,
};
pub use vault::MediaVault;
pub use worker::{ConnectionCheck, WorkerClient};

use std::sync::Arc;

/// Helper function to run the vault's API server with graceful signal handling.
///
/// Spawns the API server, waits for a termination signal, and then signals the
/// vault to shut down (in-flight waits abort, new submits are refused).
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use mediavault::{Config, MediaVault, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let vault = Arc::new(MediaVault::new(Config::default()).await?);
///     run_with_shutdown(vault).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(vault: Arc<MediaVault>) -> Result<()> {
    let server = vault.spawn_api_server();
    wait_for_signal().await;
    vault.shutdown();
    server.abort();
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
