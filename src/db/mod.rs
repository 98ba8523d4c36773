//! Database layer for mediavault
//!
//! Handles SQLite persistence for crawled posts, videos, and their media
//! assets.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`posts`] — Post entities and their image assets
//! - [`videos`] — Video entities and their cover asset

use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod posts;
mod videos;

/// New post entity to be inserted into the database
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    /// Natural key: the platform's note id
    pub note_id: String,
    /// Post title
    pub title: String,
    /// Post body text
    pub description: Option<String>,
    /// Post kind ("normal" or "video")
    pub note_type: String,
    /// Direct video URL for video posts
    pub video_url: Option<String>,
    /// Author platform id
    pub author_id: String,
    /// Author display name
    pub author_name: String,
    /// Author avatar URL
    pub author_avatar: Option<String>,
    /// Like counter
    pub liked_count: i64,
    /// Collect counter
    pub collected_count: i64,
    /// Comment counter
    pub comment_count: i64,
    /// Share counter
    pub share_count: i64,
    /// Poster location as reported by the platform
    pub ip_location: Option<String>,
    /// Comma-delimited tag list as reported by the platform
    pub tags: Option<String>,
    /// Original post URL
    pub source_url: String,
    /// Original publish time (unix seconds)
    pub published_at: Option<i64>,
}

/// Post record from database
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    /// Unique database ID
    pub id: i64,
    /// Natural key: the platform's note id
    pub note_id: String,
    /// Post title
    pub title: String,
    /// Post body text
    pub description: Option<String>,
    /// Post kind ("normal" or "video")
    pub note_type: String,
    /// Direct video URL for video posts
    pub video_url: Option<String>,
    /// Author platform id
    pub author_id: String,
    /// Author display name
    pub author_name: String,
    /// Author avatar URL
    pub author_avatar: Option<String>,
    /// Like counter
    pub liked_count: i64,
    /// Collect counter
    pub collected_count: i64,
    /// Comment counter
    pub comment_count: i64,
    /// Share counter
    pub share_count: i64,
    /// Poster location as reported by the platform
    pub ip_location: Option<String>,
    /// Comma-delimited tag list
    pub tags: Option<String>,
    /// Original post URL
    pub source_url: String,
    /// Backfilled comments as a JSON array string
    pub comments: Option<String>,
    /// Original publish time (unix seconds)
    pub published_at: Option<i64>,
    /// Unix timestamp when this record was ingested
    pub fetched_at: i64,
}

/// New media asset row (post image)
#[derive(Debug, Clone)]
pub struct NewPostImage {
    /// Parent post row
    pub post_id: crate::types::RecordId,
    /// Zero-based position in the post's image list
    pub image_index: i64,
    /// Path relative to the media directory, e.g. `xhs/{note_id}/{index}.jpg`
    pub local_path: String,
    /// Source URL retained for provenance
    pub original_url: String,
}

/// Media asset record from database (post image)
#[derive(Debug, Clone, FromRow)]
pub struct PostImage {
    /// Unique database ID
    pub id: i64,
    /// Parent post row
    pub post_id: i64,
    /// Zero-based position in the post's image list
    pub image_index: i64,
    /// Path relative to the media directory
    pub local_path: String,
    /// Source URL retained for provenance
    pub original_url: String,
}

/// New video entity to be inserted into the database
#[derive(Debug, Clone, Default)]
pub struct NewVideo {
    /// Natural key: the platform's numeric id, as stored by the worker
    pub video_id: String,
    /// Alternate key: public short code, when the caller submitted one
    pub bvid: Option<String>,
    /// Video title
    pub title: String,
    /// Video description
    pub description: Option<String>,
    /// Author platform id
    pub author_id: String,
    /// Author display name
    pub author_name: String,
    /// Author avatar URL
    pub author_avatar: Option<String>,
    /// Duration in seconds, when known
    pub duration: Option<i64>,
    /// Play counter
    pub play_count: i64,
    /// Like counter
    pub like_count: i64,
    /// Coin counter
    pub coin_count: i64,
    /// Favorite counter
    pub favorite_count: i64,
    /// Share counter
    pub share_count: i64,
    /// Danmaku counter
    pub danmaku_count: i64,
    /// Comment counter
    pub comment_count: i64,
    /// Original video URL
    pub source_url: String,
    /// Original publish time (unix seconds)
    pub published_at: Option<i64>,
}

/// Video record from database
#[derive(Debug, Clone, FromRow)]
pub struct Video {
    /// Unique database ID
    pub id: i64,
    /// Natural key: the platform's numeric id
    pub video_id: String,
    /// Alternate key: public short code
    pub bvid: Option<String>,
    /// Video title
    pub title: String,
    /// Video description
    pub description: Option<String>,
    /// Author platform id
    pub author_id: String,
    /// Author display name
    pub author_name: String,
    /// Author avatar URL
    pub author_avatar: Option<String>,
    /// Duration in seconds, when known
    pub duration: Option<i64>,
    /// Play counter
    pub play_count: i64,
    /// Like counter
    pub like_count: i64,
    /// Coin counter
    pub coin_count: i64,
    /// Favorite counter
    pub favorite_count: i64,
    /// Share counter
    pub share_count: i64,
    /// Danmaku counter
    pub danmaku_count: i64,
    /// Comment counter
    pub comment_count: i64,
    /// Relative local path of the downloaded cover, when the download succeeded
    pub cover_local_path: Option<String>,
    /// Original video URL
    pub source_url: String,
    /// Backfilled comments as a JSON array string
    pub comments: Option<String>,
    /// Original publish time (unix seconds)
    pub published_at: Option<i64>,
    /// Unix timestamp when this record was ingested
    pub fetched_at: i64,
}

/// Database handle for mediavault
pub struct Database {
    pool: SqlitePool,
}

/// True when a sqlx error is a UNIQUE constraint violation.
///
/// Two concurrent ingestions of the same natural key race to insert; the loser
/// converts this into the idempotent "existing" outcome instead of an error.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
