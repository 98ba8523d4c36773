//! Worker probes, health, events, and OpenAPI handlers.

use crate::api::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /worker/status - Remote worker state
#[utoipa::path(
    get,
    path = "/api/v1/worker/status",
    tag = "worker",
    responses(
        (status = 200, description = "Current worker status", body = crate::types::WorkerStatus),
        (status = 502, description = "Worker unreachable")
    )
)]
pub async fn worker_status(State(state): State<AppState>) -> Response {
    match state.vault.worker_status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /worker/check - Connectivity probe
#[utoipa::path(
    get,
    path = "/api/v1/worker/check",
    tag = "worker",
    responses(
        (status = 200, description = "Probe outcome (connected or not)", body = crate::worker::ConnectionCheck)
    )
)]
pub async fn worker_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.vault.check_connection().await)
}

/// POST /worker/stop - Best-effort stop of the active job
#[utoipa::path(
    post,
    path = "/api/v1/worker/stop",
    tag = "worker",
    responses(
        (status = 200, description = "Stop request accepted"),
        (status = 502, description = "Worker unreachable")
    )
)]
pub async fn worker_stop(State(state): State<AppState>) -> Response {
    match state.vault.stop_crawl().await {
        Ok(()) => (StatusCode::OK, Json(json!({"stopped": true}))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/v1/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification document")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET /events - Server-sent events stream
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.vault.subscribe();
    let stream = BroadcastStream::new(receiver);

    let sse_stream = stream.filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json_data) => {
                let event_type = match &event {
                    crate::types::Event::CrawlStarted { .. } => "crawl_started",
                    crate::types::Event::CrawlCompleted { .. } => "crawl_completed",
                    crate::types::Event::CrawlFailed { .. } => "crawl_failed",
                    crate::types::Event::CrawlTimedOut { .. } => "crawl_timed_out",
                    crate::types::Event::MediaFailed { .. } => "media_failed",
                };

                Some(Ok(SseEvent::default().event(event_type).data(json_data)))
            }
            Err(e) => {
                tracing::warn!("Failed to serialize event to JSON: {}", e);
                None
            }
        },
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("SSE client lagged, skipped {} events", skipped);
            Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{}}}"#,
                skipped
            ))))
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}
