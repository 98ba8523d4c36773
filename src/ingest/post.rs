//! Post-platform record ingestion.

use crate::db::{NewPost, NewPostImage};
use crate::error::{DatabaseError, Error, Result};
use crate::types::{Event, IngestSummary, Platform};

use super::{IngestionPipeline, count, opt_text, split_url_list, sniff_extension, text};

impl IngestionPipeline {
    /// Ingest a located post record and download its images.
    ///
    /// Returns `existing = true` without touching the network when the natural
    /// key is already persisted; this includes losing the insert race to a
    /// concurrent ingestion of the same key.
    pub async fn ingest_post(
        &self,
        record: &serde_json::Value,
        comments: &[serde_json::Value],
    ) -> Result<IngestSummary> {
        let note_id = record
            .get("note_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Envelope("post record missing note_id".into()))?
            .to_string();

        if let Some(existing) = self.db.get_post_by_note_id(&note_id).await? {
            tracing::info!(note_id, "post already ingested");
            return Ok(IngestSummary {
                natural_key: existing.note_id,
                alternate_key: None,
                title: existing.title,
                existing: true,
                media_paths: Vec::new(),
            });
        }

        let new_post = NewPost {
            note_id: note_id.clone(),
            title: text(record, "title"),
            description: opt_text(record, "desc"),
            note_type: opt_text(record, "type").unwrap_or_else(|| "normal".to_string()),
            video_url: opt_text(record, "video_url"),
            author_id: text(record, "user_id"),
            author_name: text(record, "nickname"),
            author_avatar: opt_text(record, "avatar"),
            liked_count: count(record, "liked_count"),
            collected_count: count(record, "collected_count"),
            comment_count: count(record, "comment_count"),
            share_count: count(record, "share_count"),
            ip_location: opt_text(record, "ip_location"),
            tags: opt_text(record, "tag_list"),
            source_url: text(record, "note_url"),
            // Publish time arrives in milliseconds
            published_at: record
                .get("time")
                .and_then(|v| v.as_i64())
                .filter(|ms| *ms > 0)
                .map(|ms| ms / 1000),
        };

        let post_id = match self.db.insert_post(&new_post).await {
            Ok(id) => id,
            Err(Error::Database(DatabaseError::ConstraintViolation(_))) => {
                // Lost the race to a concurrent ingestion of the same key
                let existing = self.db.get_post_by_note_id(&note_id).await?.ok_or_else(|| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "post {} vanished after constraint violation",
                        note_id
                    )))
                })?;
                tracing::info!(note_id, "post ingested concurrently");
                return Ok(IngestSummary {
                    natural_key: existing.note_id,
                    alternate_key: None,
                    title: existing.title,
                    existing: true,
                    media_paths: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };

        // Parent row persisted; now the assets, one by one, gaps allowed
        let image_urls = record
            .get("image_list")
            .and_then(|v| v.as_str())
            .map(split_url_list)
            .unwrap_or_default();

        let mut media_paths = Vec::new();
        for (index, url) in image_urls.iter().enumerate() {
            let local_path = format!("{}/{}/{}{}", Platform::Xhs, note_id, index, sniff_extension(url));
            let dest = self.media_dir.join(&local_path);

            if self.fetcher.download(url, &dest).await {
                self.db
                    .insert_post_image(&NewPostImage {
                        post_id,
                        image_index: index as i64,
                        local_path: local_path.clone(),
                        original_url: url.clone(),
                    })
                    .await?;
                media_paths.push(local_path);
            } else {
                tracing::warn!(note_id, index, url = %url, "image download failed, skipping");
                self.emit(Event::MediaFailed {
                    platform: Platform::Xhs,
                    natural_key: note_id.clone(),
                    index: index as i64,
                    url: url.clone(),
                });
            }
        }

        if !comments.is_empty() {
            let json = serde_json::to_string(comments)?;
            self.db.set_post_comments(post_id, &json).await?;
        }

        tracing::info!(
            note_id,
            images = media_paths.len(),
            comments = comments.len(),
            "post ingested"
        );

        Ok(IngestSummary {
            natural_key: note_id,
            alternate_key: None,
            title: new_post.title,
            existing: false,
            media_paths,
        })
    }
}
