//! Crawl lifecycle coordination
//!
//! [`MediaVault`] is the top-level service object: it owns the worker client,
//! the resolver, the locator, the ingestion pipeline, and local storage, and
//! drives one `submit → wait → locate → ingest` sequence at a time.
//!
//! The remote worker accepts exactly one job, so the whole sequence runs under
//! a process-wide mutex; a second caller gets an immediate conflict instead of
//! queueing. A caller-side timeout abandons the local wait but does not abort
//! the remote job — a subsequent submit may still observe `running` until the
//! orphaned job drains.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::{Database, Post, PostImage, Video};
use crate::error::{Error, Result};
use crate::fetcher::HttpMediaFetcher;
use crate::ingest::IngestionPipeline;
use crate::locator::ResultLocator;
use crate::resolver::IdResolver;
use crate::target::{
    PostTarget, VideoTarget, expand_share_link, needs_share_link_expansion, parse_post_target,
    parse_video_target,
};
use crate::types::{
    CrawlReport, CrawlRequest, Event, IngestSummary, Platform, WorkerState, WorkerStatus,
};
use crate::worker::{ConnectionCheck, CrawlJob, WorkerClient};

/// Media-crawl orchestration service.
///
/// Construct one instance at process startup and share it by reference
/// (`Arc`) with request handlers; there is no hidden global state.
pub struct MediaVault {
    /// Configuration (public for host applications mounting the API router)
    pub config: Arc<Config>,
    pub(crate) db: Arc<Database>,
    pub(crate) worker: Arc<WorkerClient>,
    resolver: IdResolver,
    locator: ResultLocator,
    pipeline: IngestionPipeline,
    http: reqwest::Client,
    /// Held across the entire start→ingest sequence (single-flight)
    crawl_lock: tokio::sync::Mutex<()>,
    event_tx: tokio::sync::broadcast::Sender<Event>,
    shutdown: CancellationToken,
}

impl MediaVault {
    /// Create a new MediaVault instance
    ///
    /// This initializes all core components:
    /// - Creates the media directory
    /// - Opens/creates the SQLite database and runs migrations
    /// - Builds the shared HTTP client and worker client
    /// - Sets up the event broadcast channel
    pub async fn new(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.storage.media_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create media directory '{}': {}",
                        config.storage.media_dir.display(),
                        e
                    ),
                ))
            })?;

        let db = Arc::new(Database::new(&config.storage.database_path).await?);

        let http = reqwest::Client::builder()
            .connect_timeout(config.worker.connect_timeout)
            .timeout(config.worker.request_timeout)
            .build()
            .map_err(Error::Network)?;

        let worker = Arc::new(WorkerClient::new(http.clone(), &config.worker));
        let resolver = IdResolver::from_config(http.clone(), &config.resolver);
        let locator = ResultLocator::new(worker.clone());

        // Buffered channel so slow subscribers don't stall ingestion
        let (event_tx, _rx) = tokio::sync::broadcast::channel(256);

        let fetcher = Arc::new(HttpMediaFetcher::new(
            http.clone(),
            config.fetch.download_timeout,
        ));
        let pipeline = IngestionPipeline::new(
            db.clone(),
            fetcher,
            config.storage.media_dir.clone(),
            event_tx.clone(),
        );

        tracing::info!(worker = %worker.base_url(), "media vault initialized");

        Ok(Self {
            config: Arc::new(config),
            db,
            worker,
            resolver,
            locator,
            pipeline,
            http,
            crawl_lock: tokio::sync::Mutex::new(()),
            event_tx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Subscribe to crawl events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all subscribers (dropped silently when none listen)
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Signal shutdown: in-flight waits abort and new submits are refused
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Submit a crawl and block until it resolves one way or the other.
    ///
    /// The uniform [`CrawlReport`] folds every taxonomy outcome (conflict,
    /// connectivity, domain failure, not-found, timeout, validation); only
    /// faults — contract breaches, storage errors — surface as `Err`.
    pub async fn submit(&self, request: CrawlRequest) -> Result<CrawlReport> {
        let outcome = self.run_crawl(&request).await;

        match outcome {
            Ok(summary) => {
                self.emit_event(Event::CrawlCompleted {
                    platform: request.platform,
                    natural_key: summary.natural_key.clone(),
                    existing: summary.existing,
                });
                Ok(CrawlReport::completed(summary))
            }
            Err(e) => {
                match &e {
                    Error::WaitTimeout { .. } => self.emit_event(Event::CrawlTimedOut {
                        platform: request.platform,
                        target: request.target_reference.clone(),
                    }),
                    Error::Validation(_)
                    | Error::Conflict(_)
                    | Error::Connectivity(_)
                    | Error::CrawlFailed(_)
                    | Error::ResultNotFound(_)
                    | Error::Resolve(_) => self.emit_event(Event::CrawlFailed {
                        platform: request.platform,
                        target: request.target_reference.clone(),
                        message: e.to_string(),
                    }),
                    _ => {}
                }
                e.into_report()
            }
        }
    }

    /// Look up a stored post with its image assets (no remote interaction)
    pub async fn get_post(&self, note_id: &str) -> Result<Option<(Post, Vec<PostImage>)>> {
        let Some(post) = self.db.get_post_by_note_id(note_id).await? else {
            return Ok(None);
        };
        let images = self.db.list_post_images(post.id).await?;
        Ok(Some((post, images)))
    }

    /// Look up a stored video by natural or alternate key (no remote interaction)
    pub async fn get_video(&self, key: &str) -> Result<Option<Video>> {
        self.db.get_video_by_key(key).await
    }

    /// Current remote worker status
    pub async fn worker_status(&self) -> Result<WorkerStatus> {
        self.worker.status().await
    }

    /// Probe worker connectivity without raising
    pub async fn check_connection(&self) -> ConnectionCheck {
        self.worker.check_connection().await
    }

    /// Best-effort stop of the active remote job
    pub async fn stop_crawl(&self) -> Result<()> {
        self.worker.stop().await
    }

    /// Poll the worker until it leaves `running`, bounded by `budget`.
    ///
    /// Returns promptly (within one poll interval) once the worker goes idle;
    /// a remote `error` state resolves to [`Error::CrawlFailed`] with the
    /// message enriched from worker logs; exceeding the budget while the
    /// worker still runs resolves to [`Error::WaitTimeout`]. Shutdown cancels
    /// the wait without signalling the remote worker.
    pub async fn wait_for_completion(&self, budget: Duration) -> Result<()> {
        let interval = self.config.worker.poll_interval;
        let started = tokio::time::Instant::now();

        loop {
            let status = self.worker.status().await?;
            match status.status {
                WorkerState::Idle => return Ok(()),
                WorkerState::Error => {
                    // The first error-level log line usually names the real
                    // cause; the status message is the fallback
                    let message = match self.locator.first_error_log().await {
                        Some(m) => m,
                        None => status
                            .error_message
                            .filter(|m| !m.is_empty())
                            .unwrap_or_else(|| "crawl failed".to_string()),
                    };
                    return Err(Error::CrawlFailed(message));
                }
                WorkerState::Running => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= budget {
                return Err(Error::WaitTimeout {
                    budget_secs: budget.as_secs(),
                });
            }

            let nap = interval.min(budget - elapsed);
            tokio::select! {
                _ = self.shutdown.cancelled() => return Err(Error::ShuttingDown),
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }

    /// Run one crawl sequence and return the ingestion summary
    async fn run_crawl(&self, request: &CrawlRequest) -> Result<IngestSummary> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShuttingDown);
        }
        match request.platform {
            Platform::Xhs => self.run_post_crawl(request).await,
            Platform::Bili => self.run_video_crawl(request).await,
        }
    }

    async fn run_post_crawl(&self, request: &CrawlRequest) -> Result<IngestSummary> {
        let target = self.parse_post_reference(&request.target_reference).await?;

        // Short-circuit before touching the worker at all
        if let Some(existing) = self.db.get_post_by_note_id(&target.note_id).await? {
            tracing::info!(note_id = %target.note_id, "post already stored, skipping crawl");
            return Ok(IngestSummary {
                natural_key: existing.note_id,
                alternate_key: None,
                title: existing.title,
                existing: true,
                media_paths: Vec::new(),
            });
        }

        // Exclusive section spans the whole start→ingest sequence
        let _flight = self
            .crawl_lock
            .try_lock()
            .map_err(|_| Error::Conflict("another crawl is already in flight".into()))?;

        self.start_job(
            Platform::Xhs,
            target.url.clone(),
            request.include_comments,
            &request.target_reference,
        )
        .await?;
        self.wait_for_completion(self.config.worker.wait_budget)
            .await?;

        let record = self
            .locate_or_diagnose(Platform::Xhs, &target.note_id, "the post")
            .await?;

        let comments = self
            .collect_comments(Platform::Xhs, &target.note_id, request.include_comments)
            .await;

        self.pipeline.ingest_post(&record, &comments).await
    }

    async fn run_video_crawl(&self, request: &CrawlRequest) -> Result<IngestSummary> {
        let target = parse_video_target(&request.target_reference)?;

        // Either key form may already be stored
        let lookup_key = match &target {
            VideoTarget::ShortCode(code) => code.clone(),
            VideoTarget::Numeric(id) => id.to_string(),
        };
        if let Some(existing) = self.db.get_video_by_key(&lookup_key).await? {
            tracing::info!(key = %lookup_key, "video already stored, skipping crawl");
            return Ok(IngestSummary {
                natural_key: existing.video_id,
                alternate_key: existing.bvid,
                title: existing.title,
                existing: true,
                media_paths: Vec::new(),
            });
        }

        let _flight = self
            .crawl_lock
            .try_lock()
            .map_err(|_| Error::Conflict("another crawl is already in flight".into()))?;

        self.start_job(
            Platform::Bili,
            target.as_worker_id(),
            request.include_comments,
            &request.target_reference,
        )
        .await?;
        self.wait_for_completion(self.config.worker.wait_budget)
            .await?;

        // The worker stores videos under the numeric id, so short codes are
        // transcoded before the result files are searched
        let numeric_key = match &target {
            VideoTarget::ShortCode(code) => self.resolver.resolve(code).await?.to_string(),
            VideoTarget::Numeric(id) => id.to_string(),
        };

        let record = self
            .locate_or_diagnose(Platform::Bili, &numeric_key, "the video")
            .await?;

        let comments = self
            .collect_comments(Platform::Bili, &numeric_key, request.include_comments)
            .await;

        self.pipeline
            .ingest_video(&record, target.short_code(), &comments)
            .await
    }

    /// Expand share links when needed, then parse the post reference
    async fn parse_post_reference(&self, reference: &str) -> Result<PostTarget> {
        let text = if needs_share_link_expansion(reference) {
            expand_share_link(&self.http, reference).await
        } else {
            reference.to_string()
        };
        parse_post_target(&text)
    }

    /// Check remote state and start the job, failing fast on a busy worker
    async fn start_job(
        &self,
        platform: Platform,
        specified_ids: String,
        include_comments: bool,
        target: &str,
    ) -> Result<()> {
        let status = self.worker.status().await?;
        if status.status == WorkerState::Running {
            return Err(Error::Conflict(
                "the crawl worker is busy with another job".into(),
            ));
        }

        let job = CrawlJob::detail(platform, specified_ids, include_comments);
        self.worker.start_crawl(&job).await?;
        self.emit_event(Event::CrawlStarted {
            platform,
            target: target.to_string(),
        });
        Ok(())
    }

    /// Locate the matching record, turning a miss into a diagnosed not-found
    async fn locate_or_diagnose(
        &self,
        platform: Platform,
        key: &str,
        what: &str,
    ) -> Result<serde_json::Value> {
        match self.locator.find_record(platform, key).await? {
            Some(record) => Ok(record),
            None => {
                let message = match self.locator.diagnose_miss().await {
                    Some(m) => m,
                    None => format!("no crawl output matched {}; verify the link is valid", what),
                };
                Err(Error::ResultNotFound(message))
            }
        }
    }

    /// Best-effort comment collection; failures log and yield an empty set
    async fn collect_comments(
        &self,
        platform: Platform,
        key: &str,
        include_comments: bool,
    ) -> Vec<serde_json::Value> {
        if !include_comments {
            return Vec::new();
        }
        match self.locator.find_comments(platform, key).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::warn!(platform = %platform, key, error = %e, "comment backfill failed");
                Vec::new()
            }
        }
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with crawl processing and listens on the
    /// configured bind address.
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let vault = self.clone();
        let config = vault.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(vault, config).await })
    }
}
