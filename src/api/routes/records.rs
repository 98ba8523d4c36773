//! Stored-record lookup handlers.

use crate::api::AppState;
use crate::db::{Post, PostImage, Video};
use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// Author fields shared by post and video responses
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorResponse {
    /// Author platform id
    pub id: String,
    /// Author display name
    pub name: String,
    /// Author avatar URL
    pub avatar: Option<String>,
}

/// One locally stored image asset
#[derive(Debug, Serialize, ToSchema)]
pub struct PostImageResponse {
    /// Zero-based position in the post's image list (gaps mean failed downloads)
    pub index: i64,
    /// Serving path, relative to the media root
    pub path: String,
    /// Source URL retained for provenance
    pub original_url: String,
}

/// Stored post with its image assets
#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    /// Natural key
    pub note_id: String,
    /// Post title
    pub title: String,
    /// Post body text
    pub desc: Option<String>,
    /// Post kind ("normal" or "video")
    pub note_type: String,
    /// Direct video URL for video posts
    pub video_url: Option<String>,
    /// Author details
    pub author: AuthorResponse,
    /// Engagement counters
    pub stats: serde_json::Value,
    /// Poster location
    pub ip_location: Option<String>,
    /// Tag list
    pub tags: Vec<String>,
    /// Original post URL
    pub source_url: String,
    /// Backfilled comments
    pub comments: serde_json::Value,
    /// Locally stored images, ordered by index
    pub images: Vec<PostImageResponse>,
    /// Original publish time (RFC 3339)
    pub created_at: Option<String>,
    /// Ingestion time (RFC 3339)
    pub fetched_at: Option<String>,
}

/// Stored video
#[derive(Debug, Serialize, ToSchema)]
pub struct VideoResponse {
    /// Natural key (numeric id)
    pub video_id: String,
    /// Alternate key (short code)
    pub bvid: Option<String>,
    /// Video title
    pub title: String,
    /// Video description
    pub desc: Option<String>,
    /// Author details
    pub author: AuthorResponse,
    /// Engagement counters
    pub stats: serde_json::Value,
    /// Serving path of the downloaded cover, relative to the media root
    pub cover: Option<String>,
    /// Original video URL
    pub source_url: String,
    /// Backfilled comments
    pub comments: serde_json::Value,
    /// Original publish time (RFC 3339)
    pub created_at: Option<String>,
    /// Ingestion time (RFC 3339)
    pub fetched_at: Option<String>,
}

fn rfc3339(ts: Option<i64>) -> Option<String> {
    ts.and_then(|t| chrono::DateTime::from_timestamp(t, 0))
        .map(|dt| dt.to_rfc3339())
}

fn comments_value(raw: Option<&str>) -> serde_json::Value {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_else(|| serde_json::Value::Array(Vec::new()))
}

impl PostResponse {
    fn from_record(post: Post, images: Vec<PostImage>) -> Self {
        Self {
            note_id: post.note_id,
            title: post.title,
            desc: post.description,
            note_type: post.note_type,
            video_url: post.video_url,
            author: AuthorResponse {
                id: post.author_id,
                name: post.author_name,
                avatar: post.author_avatar,
            },
            stats: serde_json::json!({
                "liked": post.liked_count,
                "collected": post.collected_count,
                "comment": post.comment_count,
                "share": post.share_count,
            }),
            ip_location: post.ip_location,
            tags: post
                .tags
                .map(|t| t.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            source_url: post.source_url,
            comments: comments_value(post.comments.as_deref()),
            images: images
                .into_iter()
                .map(|img| PostImageResponse {
                    index: img.image_index,
                    path: format!("/{}", img.local_path),
                    original_url: img.original_url,
                })
                .collect(),
            created_at: rfc3339(post.published_at),
            fetched_at: rfc3339(Some(post.fetched_at)),
        }
    }
}

impl VideoResponse {
    fn from_record(video: Video) -> Self {
        Self {
            video_id: video.video_id,
            bvid: video.bvid,
            title: video.title,
            desc: video.description,
            author: AuthorResponse {
                id: video.author_id,
                name: video.author_name,
                avatar: video.author_avatar,
            },
            stats: serde_json::json!({
                "play": video.play_count,
                "like": video.like_count,
                "coin": video.coin_count,
                "favorite": video.favorite_count,
                "share": video.share_count,
                "danmaku": video.danmaku_count,
                "comment": video.comment_count,
            }),
            cover: video.cover_local_path.map(|p| format!("/{}", p)),
            source_url: video.source_url,
            comments: comments_value(video.comments.as_deref()),
            created_at: rfc3339(video.published_at),
            fetched_at: rfc3339(Some(video.fetched_at)),
        }
    }
}

/// GET /posts/:note_id - Get a stored post with its images
#[utoipa::path(
    get,
    path = "/api/v1/posts/{note_id}",
    tag = "records",
    params(
        ("note_id" = String, Path, description = "Post natural key")
    ),
    responses(
        (status = 200, description = "Stored post", body = PostResponse),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_post(State(state): State<AppState>, Path(note_id): Path<String>) -> Response {
    match state.vault.get_post(&note_id).await {
        Ok(Some((post, images))) => {
            (StatusCode::OK, Json(PostResponse::from_record(post, images))).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, Json(ApiError::not_found("post"))).into_response(),
        Err(e) => {
            tracing::error!(note_id, error = %e, "failed to load post");
            e.into_response()
        }
    }
}

/// GET /videos/:id - Get a stored video by natural or alternate key
#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}",
    tag = "records",
    params(
        ("id" = String, Path, description = "Video natural key (numeric id) or alternate key (short code)")
    ),
    responses(
        (status = 200, description = "Stored video", body = VideoResponse),
        (status = 404, description = "Video not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_video(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.vault.get_video(&id).await {
        Ok(Some(video)) => (StatusCode::OK, Json(VideoResponse::from_record(video))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(ApiError::not_found("video"))).into_response(),
        Err(e) => {
            tracing::error!(id, error = %e, "failed to load video");
            e.into_response()
        }
    }
}
