//! Ingestion pipeline
//!
//! Maps a located raw record into local entities, enforces deduplication by
//! natural (and alternate) key, and drives the media fetcher for each
//! referenced asset.
//!
//! Raw records are loosely structured, so every field is mapped defensively:
//! missing or non-numeric counters become 0, absent optional fields become
//! `None`. A failed asset download leaves a gap in the index sequence and
//! never aborts the ingestion. Re-ingesting an already-persisted natural key
//! is a no-op reported as `existing`.

mod post;
mod video;

use std::path::PathBuf;
use std::sync::Arc;

use crate::db::Database;
use crate::fetcher::MediaFetcher;
use crate::types::Event;

/// Drives record mapping, persistence, and asset downloads
pub struct IngestionPipeline {
    pub(crate) db: Arc<Database>,
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    pub(crate) media_dir: PathBuf,
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl IngestionPipeline {
    /// Create a pipeline over the given storage and fetcher
    pub fn new(
        db: Arc<Database>,
        fetcher: Arc<dyn MediaFetcher>,
        media_dir: PathBuf,
        event_tx: tokio::sync::broadcast::Sender<Event>,
    ) -> Self {
        Self {
            db,
            fetcher,
            media_dir,
            event_tx,
        }
    }

    pub(crate) fn emit(&self, event: Event) {
        // send() errs when no one subscribes, which is fine
        self.event_tx.send(event).ok();
    }
}

/// Required string field; `None` when absent, empty, or not a string
pub(crate) fn opt_text(record: &serde_json::Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// String field defaulting to empty
pub(crate) fn text(record: &serde_json::Value, key: &str) -> String {
    opt_text(record, key).unwrap_or_default()
}

/// Counter field: accepts numbers and numeric strings, anything else is 0
pub(crate) fn count(record: &serde_json::Value, key: &str) -> i64 {
    match record.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Split a delimited URL list into an ordered sequence, dropping blanks
pub(crate) fn split_url_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sniff a file extension from a media URL, defaulting to `.jpg`
pub(crate) fn sniff_extension(url: &str) -> &'static str {
    let lower = url.to_lowercase();
    if lower.contains(".png") {
        ".png"
    } else if lower.contains(".webp") {
        ".webp"
    } else if lower.contains(".gif") {
        ".gif"
    } else {
        ".jpg"
    }
}
