//! Video-platform record ingestion.

use crate::db::NewVideo;
use crate::error::{DatabaseError, Error, Result};
use crate::types::{Event, IngestSummary, Platform};

use super::{IngestionPipeline, count, opt_text, sniff_extension, text};

impl IngestionPipeline {
    /// Ingest a located video record and download its cover.
    ///
    /// `bvid` is the short code the caller originally submitted, persisted as
    /// the alternate key. Dedup checks both keys before writing anything.
    pub async fn ingest_video(
        &self,
        record: &serde_json::Value,
        bvid: Option<&str>,
        comments: &[serde_json::Value],
    ) -> Result<IngestSummary> {
        let video_id = record
            .get("video_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Envelope("video record missing video_id".into()))?
            .to_string();

        // Either key may already be present
        let mut existing = self.db.get_video_by_key(&video_id).await?;
        if existing.is_none()
            && let Some(code) = bvid
        {
            existing = self.db.get_video_by_key(code).await?;
        }
        if let Some(existing) = existing {
            tracing::info!(video_id, "video already ingested");
            return Ok(IngestSummary {
                natural_key: existing.video_id,
                alternate_key: existing.bvid,
                title: existing.title,
                existing: true,
                media_paths: Vec::new(),
            });
        }

        let new_video = NewVideo {
            video_id: video_id.clone(),
            bvid: bvid.map(str::to_string),
            title: text(record, "title"),
            description: opt_text(record, "desc"),
            author_id: text(record, "user_id"),
            author_name: text(record, "nickname"),
            author_avatar: opt_text(record, "avatar"),
            duration: record.get("duration").and_then(|v| v.as_i64()),
            play_count: count(record, "video_play_count"),
            like_count: count(record, "liked_count"),
            coin_count: count(record, "video_coin_count"),
            favorite_count: count(record, "video_favorite_count"),
            share_count: count(record, "video_share_count"),
            danmaku_count: count(record, "video_danmaku"),
            comment_count: count(record, "video_comment"),
            source_url: text(record, "video_url"),
            published_at: record
                .get("create_time")
                .and_then(|v| v.as_i64())
                .filter(|secs| *secs > 0),
        };

        let row_id = match self.db.insert_video(&new_video).await {
            Ok(id) => id,
            Err(Error::Database(DatabaseError::ConstraintViolation(_))) => {
                let existing = self.db.get_video_by_key(&video_id).await?.ok_or_else(|| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "video {} vanished after constraint violation",
                        video_id
                    )))
                })?;
                tracing::info!(video_id, "video ingested concurrently");
                return Ok(IngestSummary {
                    natural_key: existing.video_id,
                    alternate_key: existing.bvid,
                    title: existing.title,
                    existing: true,
                    media_paths: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };

        let mut media_paths = Vec::new();
        if let Some(cover_url) = opt_text(record, "video_cover_url") {
            let local_path = format!(
                "bilibili/{}/cover{}",
                video_id,
                sniff_extension(&cover_url)
            );
            let dest = self.media_dir.join(&local_path);

            if self.fetcher.download(&cover_url, &dest).await {
                self.db.set_video_cover(row_id, &local_path).await?;
                media_paths.push(local_path);
            } else {
                tracing::warn!(video_id, url = %cover_url, "cover download failed, skipping");
                self.emit(Event::MediaFailed {
                    platform: Platform::Bili,
                    natural_key: video_id.clone(),
                    index: 0,
                    url: cover_url,
                });
            }
        }

        if !comments.is_empty() {
            let json = serde_json::to_string(comments)?;
            self.db.set_video_comments(row_id, &json).await?;
        }

        tracing::info!(video_id, comments = comments.len(), "video ingested");

        Ok(IngestSummary {
            natural_key: video_id,
            alternate_key: bvid.map(str::to_string),
            title: new_video.title,
            existing: false,
            media_paths,
        })
    }
}
