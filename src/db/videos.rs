//! Video entity CRUD operations.

use crate::error::DatabaseError;
use crate::types::RecordId;
use crate::{Error, Result};

use super::{Database, NewVideo, Video, is_unique_violation};

const VIDEO_COLUMNS: &str = r#"
    id, video_id, bvid, title, description,
    author_id, author_name, author_avatar, duration,
    play_count, like_count, coin_count, favorite_count,
    share_count, danmaku_count, comment_count,
    cover_local_path, source_url, comments, published_at, fetched_at
"#;

impl Database {
    /// Insert a new video record.
    ///
    /// A duplicate natural or alternate key surfaces as
    /// [`DatabaseError::ConstraintViolation`] so the ingestion layer can fold
    /// the race into its idempotent "existing" outcome.
    pub async fn insert_video(&self, video: &NewVideo) -> Result<RecordId> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO videos (
                video_id, bvid, title, description,
                author_id, author_name, author_avatar, duration,
                play_count, like_count, coin_count, favorite_count,
                share_count, danmaku_count, comment_count,
                source_url, published_at, fetched_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.video_id)
        .bind(&video.bvid)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.author_id)
        .bind(&video.author_name)
        .bind(&video.author_avatar)
        .bind(video.duration)
        .bind(video.play_count)
        .bind(video.like_count)
        .bind(video.coin_count)
        .bind(video.favorite_count)
        .bind(video.share_count)
        .bind(video.danmaku_count)
        .bind(video.comment_count)
        .bind(&video.source_url)
        .bind(video.published_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Database(DatabaseError::ConstraintViolation(format!(
                    "video {} already exists",
                    video.video_id
                )))
            } else {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert video: {}",
                    e
                )))
            }
        })?;

        Ok(RecordId(result.last_insert_rowid()))
    }

    /// Get a video by natural key (numeric id) or alternate key (short code).
    ///
    /// A single lookup serves both because callers may hold either form of
    /// the identifier.
    pub async fn get_video_by_key(&self, key: &str) -> Result<Option<Video>> {
        let row = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM videos WHERE video_id = ? OR bvid = ?",
            VIDEO_COLUMNS
        ))
        .bind(key)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get video: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Record the downloaded cover path on a video
    pub async fn set_video_cover(&self, id: RecordId, local_path: &str) -> Result<()> {
        sqlx::query("UPDATE videos SET cover_local_path = ? WHERE id = ?")
            .bind(local_path)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set video cover: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Store backfilled comments (JSON array string) on a video
    pub async fn set_video_comments(&self, id: RecordId, comments_json: &str) -> Result<()> {
        sqlx::query("UPDATE videos SET comments = ? WHERE id = ?")
            .bind(comments_json)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set video comments: {}",
                    e
                )))
            })?;

        Ok(())
    }
}
