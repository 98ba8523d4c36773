//! Crawl submission handlers.

use crate::api::AppState;
use crate::types::{CrawlRequest, Platform};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use utoipa::ToSchema;

/// Request body for crawl submission
#[derive(Debug, Deserialize, ToSchema)]
pub struct CrawlUrlRequest {
    /// Post/video URL, share link, or bare identifier
    pub url: String,
    /// Also collect comments
    #[serde(default)]
    pub enable_comments: bool,
}

/// POST /crawl/xhs - Crawl a post
///
/// Synchronous: blocks until the crawl resolves (completed, failed, or the
/// wait budget runs out) and returns the uniform report.
#[utoipa::path(
    post,
    path = "/api/v1/crawl/xhs",
    tag = "crawl",
    request_body = CrawlUrlRequest,
    responses(
        (status = 200, description = "Crawl resolved; see report status", body = crate::types::CrawlReport),
        (status = 500, description = "Internal server error"),
        (status = 502, description = "Worker API contract breach")
    )
)]
pub async fn crawl_post(State(state): State<AppState>, Json(req): Json<CrawlUrlRequest>) -> Response {
    submit(state, Platform::Xhs, req).await
}

/// POST /crawl/bili - Crawl a video
///
/// Synchronous: blocks until the crawl resolves (completed, failed, or the
/// wait budget runs out) and returns the uniform report.
#[utoipa::path(
    post,
    path = "/api/v1/crawl/bili",
    tag = "crawl",
    request_body = CrawlUrlRequest,
    responses(
        (status = 200, description = "Crawl resolved; see report status", body = crate::types::CrawlReport),
        (status = 500, description = "Internal server error"),
        (status = 502, description = "Worker API contract breach")
    )
)]
pub async fn crawl_video(
    State(state): State<AppState>,
    Json(req): Json<CrawlUrlRequest>,
) -> Response {
    submit(state, Platform::Bili, req).await
}

async fn submit(state: AppState, platform: Platform, req: CrawlUrlRequest) -> Response {
    let request = CrawlRequest {
        platform,
        target_reference: req.url,
        include_comments: req.enable_comments,
    };

    match state.vault.submit(request).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            tracing::error!(platform = %platform, error = %e, "crawl submit fault");
            e.into_response()
        }
    }
}
