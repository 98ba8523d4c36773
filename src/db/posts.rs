//! Post entity CRUD and image asset operations.

use crate::error::DatabaseError;
use crate::types::RecordId;
use crate::{Error, Result};

use super::{Database, NewPost, NewPostImage, Post, PostImage, is_unique_violation};

const POST_COLUMNS: &str = r#"
    id, note_id, title, description, note_type, video_url,
    author_id, author_name, author_avatar,
    liked_count, collected_count, comment_count, share_count,
    ip_location, tags, source_url, comments, published_at, fetched_at
"#;

impl Database {
    /// Insert a new post record.
    ///
    /// A duplicate natural key surfaces as
    /// [`DatabaseError::ConstraintViolation`] so the ingestion layer can fold
    /// the race into its idempotent "existing" outcome.
    pub async fn insert_post(&self, post: &NewPost) -> Result<RecordId> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (
                note_id, title, description, note_type, video_url,
                author_id, author_name, author_avatar,
                liked_count, collected_count, comment_count, share_count,
                ip_location, tags, source_url, published_at, fetched_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.note_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.note_type)
        .bind(&post.video_url)
        .bind(&post.author_id)
        .bind(&post.author_name)
        .bind(&post.author_avatar)
        .bind(post.liked_count)
        .bind(post.collected_count)
        .bind(post.comment_count)
        .bind(post.share_count)
        .bind(&post.ip_location)
        .bind(&post.tags)
        .bind(&post.source_url)
        .bind(post.published_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Database(DatabaseError::ConstraintViolation(format!(
                    "post {} already exists",
                    post.note_id
                )))
            } else {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert post: {}",
                    e
                )))
            }
        })?;

        Ok(RecordId(result.last_insert_rowid()))
    }

    /// Get a post by its natural key
    pub async fn get_post_by_note_id(&self, note_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE note_id = ?",
            POST_COLUMNS
        ))
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get post: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Store backfilled comments (JSON array string) on a post
    pub async fn set_post_comments(&self, id: RecordId, comments_json: &str) -> Result<()> {
        sqlx::query("UPDATE posts SET comments = ? WHERE id = ?")
            .bind(comments_json)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set post comments: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Insert a post image asset row.
    ///
    /// Called only after the asset's download succeeded; a failed download
    /// leaves a gap in the index sequence instead of a row.
    pub async fn insert_post_image(&self, image: &NewPostImage) -> Result<RecordId> {
        let result = sqlx::query(
            r#"
            INSERT INTO post_images (post_id, image_index, local_path, original_url)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(image.post_id)
        .bind(image.image_index)
        .bind(&image.local_path)
        .bind(&image.original_url)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert post image: {}",
                e
            )))
        })?;

        Ok(RecordId(result.last_insert_rowid()))
    }

    /// List a post's image assets ordered by index
    pub async fn list_post_images(&self, post_id: i64) -> Result<Vec<PostImage>> {
        let rows = sqlx::query_as::<_, PostImage>(
            r#"
            SELECT id, post_id, image_index, local_path, original_url
            FROM post_images
            WHERE post_id = ?
            ORDER BY image_index ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list post images: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
