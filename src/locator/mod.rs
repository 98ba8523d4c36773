//! Result location
//!
//! After a crawl completes, the worker's output sits in dated, unindexed JSON
//! files. This module finds the record matching a requested identifier:
//! list files, sort by modification time (newest first), scan detail-payload
//! files before anything else, skip comment dumps, and linearly match the
//! natural-key field inside each file's `{data, total}` envelope.
//!
//! A miss is a [`NotFound`](crate::Error::ResultNotFound)-shaped outcome,
//! distinct from timeouts and connectivity failures; recent worker logs are
//! inspected to turn a bare miss into a more specific user-facing message.

mod classify;

pub use classify::{FileKind, classify_file};

use std::sync::Arc;

use crate::error::Result;
use crate::types::{DataFile, Platform};
use crate::worker::WorkerClient;

/// Natural-key field name inside result records for a platform
fn key_field(platform: Platform) -> &'static str {
    match platform {
        Platform::Xhs => "note_id",
        Platform::Bili => "video_id",
    }
}

/// Exact natural-key comparison, tolerating numeric storage of numeric keys
fn value_matches(value: Option<&serde_json::Value>, key: &str) -> bool {
    match value {
        Some(serde_json::Value::String(s)) => s == key,
        Some(serde_json::Value::Number(n)) => n.to_string() == key,
        _ => false,
    }
}

/// Locates raw result records in the worker's output files
pub struct ResultLocator {
    worker: Arc<WorkerClient>,
}

impl ResultLocator {
    /// Create a locator over the given worker client
    pub fn new(worker: Arc<WorkerClient>) -> Self {
        Self { worker }
    }

    /// Find the record whose natural-key field equals `key`.
    ///
    /// `key` must already be in the worker's storage convention (numeric id
    /// for videos, see [`crate::resolver`]). For the post platform a matching
    /// record must also carry a `title` field, rejecting comment rows that
    /// leaked into mixed files. Returns `Ok(None)` when every file has been
    /// scanned without a match.
    pub async fn find_record(
        &self,
        platform: Platform,
        key: &str,
    ) -> Result<Option<serde_json::Value>> {
        let mut files = self.worker.data_files(platform).await?;
        // Newest first; a just-finished crawl almost always wrote the last file
        files.sort_by(|a, b| {
            b.modified_at
                .partial_cmp(&a.modified_at)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let (primary, other): (Vec<&DataFile>, Vec<&DataFile>) = files
            .iter()
            .filter(|f| classify_file(&f.name) != FileKind::CommentOnly)
            .partition(|f| classify_file(&f.name) == FileKind::PrimaryContent);

        let field = key_field(platform);
        let require_title = platform == Platform::Xhs;

        for file in primary.into_iter().chain(other) {
            let envelope = self.worker.file_content(&file.path).await?;
            for item in &envelope.data {
                if value_matches(item.get(field), key)
                    && (!require_title || item.get("title").is_some())
                {
                    tracing::debug!(platform = %platform, key, file = %file.name, "record located");
                    return Ok(Some(item.clone()));
                }
            }
        }

        tracing::info!(platform = %platform, key, "no matching record in result files");
        Ok(None)
    }

    /// Collect comment rows belonging to `key` from comment-classified files.
    ///
    /// Best-effort backfill input: unreadable files are skipped and an empty
    /// result is not an error.
    pub async fn find_comments(
        &self,
        platform: Platform,
        key: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let mut files = self.worker.data_files(platform).await?;
        files.sort_by(|a, b| {
            b.modified_at
                .partial_cmp(&a.modified_at)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let field = key_field(platform);
        let mut comments = Vec::new();

        for file in files
            .iter()
            .filter(|f| classify_file(&f.name) == FileKind::CommentOnly)
        {
            let envelope = match self.worker.file_content(&file.path).await {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "skipping unreadable comment file");
                    continue;
                }
            };
            for item in envelope.data {
                if value_matches(item.get(field), key) {
                    comments.push(item);
                }
            }
            if !comments.is_empty() {
                // Comment dumps are per-crawl; the newest matching file has them all
                break;
            }
        }

        Ok(comments)
    }

    /// Turn a bare locate miss into a more specific message by scanning recent
    /// worker logs for known failure indications.
    ///
    /// Best-effort enrichment: log fetch failures yield `None` and the generic
    /// message stands.
    pub async fn diagnose_miss(&self) -> Option<String> {
        let logs = match self.worker.recent_logs().await {
            Ok(logs) => logs,
            Err(e) => {
                tracing::debug!(error = %e, "log inspection unavailable");
                return None;
            }
        };

        for log in &logs {
            let msg = log.message.as_str();
            let lower = msg.to_lowercase();
            if msg.contains("Failed to get note detail") {
                return Some("the post does not exist or has been deleted".to_string());
            }
            if lower.contains("login") && lower.contains("fail") {
                return Some("worker login failed; scan the QR code to log in again".to_string());
            }
            if msg.contains("Failed to get") || lower.contains("not found") {
                return Some("the record does not exist or has been deleted".to_string());
            }
        }
        None
    }

    /// First error-level log line, used to enrich a domain-level crawl failure
    pub async fn first_error_log(&self) -> Option<String> {
        let logs = self.worker.recent_logs().await.ok()?;
        logs.iter()
            .find(|l| l.level.eq_ignore_ascii_case("error"))
            .map(|l| l.message.clone())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn locator_for(server: &MockServer) -> ResultLocator {
        let config = WorkerConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        ResultLocator::new(Arc::new(WorkerClient::new(reqwest::Client::new(), &config)))
    }

    async fn mount_files(server: &MockServer, platform: &str, files: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/data/files"))
            .and(query_param("platform", platform))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": files})))
            .mount(server)
            .await;
    }

    async fn mount_content(server: &MockServer, file_path: &str, data: serde_json::Value) {
        let total = data.as_array().map(|a| a.len()).unwrap_or(0);
        Mock::given(method("GET"))
            .and(path(format!("/data/files/{}", file_path)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": data, "total": total})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn finds_record_in_primary_content_file() {
        let server = MockServer::start().await;
        mount_files(
            &server,
            "bili",
            json!([
                {"name": "2024_detail_contents_1.json", "path": "bili/2024_detail_contents_1.json", "modified_at": 100.0}
            ]),
        )
        .await;
        mount_content(
            &server,
            "bili/2024_detail_contents_1.json",
            json!([
                {"video_id": "99", "title": "other"},
                {"video_id": "170001", "title": "the one"}
            ]),
        )
        .await;

        let record = locator_for(&server)
            .find_record(Platform::Bili, "170001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record["title"], "the one");
    }

    #[tokio::test]
    async fn tagged_file_with_match_beats_newer_untagged_without() {
        let server = MockServer::start().await;
        // The untagged file is newer but holds no match; the older tagged file
        // must still produce the hit
        mount_files(
            &server,
            "bili",
            json!([
                {"name": "2024_search_9.json", "path": "bili/2024_search_9.json", "modified_at": 900.0},
                {"name": "2024_detail_contents_1.json", "path": "bili/2024_detail_contents_1.json", "modified_at": 100.0}
            ]),
        )
        .await;
        mount_content(&server, "bili/2024_search_9.json", json!([{"video_id": "1"}])).await;
        mount_content(
            &server,
            "bili/2024_detail_contents_1.json",
            json!([{"video_id": "170001", "title": "tagged hit"}]),
        )
        .await;

        let record = locator_for(&server)
            .find_record(Platform::Bili, "170001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record["title"], "tagged hit");
    }

    #[tokio::test]
    async fn comment_files_are_never_scanned_for_records() {
        let server = MockServer::start().await;
        mount_files(
            &server,
            "xhs",
            json!([
                {"name": "2024_detail_comments_1.json", "path": "xhs/2024_detail_comments_1.json", "modified_at": 500.0}
            ]),
        )
        .await;
        // Even though the comment file contains the key, it must not match
        mount_content(
            &server,
            "xhs/2024_detail_comments_1.json",
            json!([{"note_id": "abc123", "title": "a comment somehow"}]),
        )
        .await;

        let record = locator_for(&server)
            .find_record(Platform::Xhs, "abc123")
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn post_match_requires_title_field() {
        let server = MockServer::start().await;
        mount_files(
            &server,
            "xhs",
            json!([
                {"name": "2024_mixed.json", "path": "xhs/2024_mixed.json", "modified_at": 500.0}
            ]),
        )
        .await;
        mount_content(
            &server,
            "xhs/2024_mixed.json",
            json!([{"note_id": "abc123", "content": "comment row without title"}]),
        )
        .await;

        let record = locator_for(&server)
            .find_record(Platform::Xhs, "abc123")
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn exhausting_all_files_is_none_not_error() {
        let server = MockServer::start().await;
        mount_files(&server, "bili", json!([])).await;

        let record = locator_for(&server)
            .find_record(Platform::Bili, "170001")
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn comments_collected_from_comment_files_only() {
        let server = MockServer::start().await;
        mount_files(
            &server,
            "xhs",
            json!([
                {"name": "2024_detail_contents_1.json", "path": "xhs/c.json", "modified_at": 600.0},
                {"name": "2024_detail_comments_1.json", "path": "xhs/m.json", "modified_at": 500.0}
            ]),
        )
        .await;
        mount_content(&server, "xhs/c.json", json!([{"note_id": "abc123", "title": "t"}])).await;
        mount_content(
            &server,
            "xhs/m.json",
            json!([
                {"note_id": "abc123", "content": "first!"},
                {"note_id": "zzz", "content": "unrelated"}
            ]),
        )
        .await;

        let comments = locator_for(&server)
            .find_comments(Platform::Xhs, "abc123")
            .await
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["content"], "first!");
    }

    #[tokio::test]
    async fn diagnose_miss_reads_known_log_patterns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/crawler/logs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "logs": [
                    {"level": "info", "message": "starting detail crawl"},
                    {"level": "error", "message": "Login failed: qrcode expired"}
                ]
            })))
            .mount(&server)
            .await;

        let message = locator_for(&server).diagnose_miss().await.unwrap();
        assert!(message.contains("login failed"));

        let first_error = locator_for(&server).first_error_log().await.unwrap();
        assert!(first_error.contains("qrcode expired"));
    }
}
