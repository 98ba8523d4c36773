//! REST API server module
//!
//! Exposes the vault's public operation surface to a thin router layer:
//! synchronous crawl submission, local record lookups, worker probes, and a
//! server-sent event stream. Authentication and the surrounding application's
//! CRUD surface are the host's concern; this router only covers the crawl
//! core.

use crate::{Config, MediaVault, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Crawling
/// - `POST /api/v1/crawl/xhs` - Crawl a post (synchronous, blocks for the wait budget)
/// - `POST /api/v1/crawl/bili` - Crawl a video (synchronous, blocks for the wait budget)
///
/// ## Stored records
/// - `GET /api/v1/posts/:note_id` - Get a stored post with its images
/// - `GET /api/v1/videos/:id` - Get a stored video by natural or alternate key
///
/// ## Worker
/// - `GET /api/v1/worker/status` - Remote worker state
/// - `GET /api/v1/worker/check` - Connectivity probe
/// - `POST /api/v1/worker/stop` - Best-effort stop of the active job
///
/// ## System
/// - `GET /api/v1/health` - Health check
/// - `GET /api/v1/events` - Server-sent events stream
/// - `GET /api/v1/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive documentation (if enabled)
pub fn create_router(vault: Arc<MediaVault>, config: Arc<Config>) -> Router {
    let state = AppState::new(vault, config.clone());

    let api = Router::new()
        // Crawling
        .route("/crawl/xhs", post(routes::crawl_post))
        .route("/crawl/bili", post(routes::crawl_video))
        // Stored records
        .route("/posts/:note_id", get(routes::get_post))
        .route("/videos/:id", get(routes::get_video))
        // Worker
        .route("/worker/status", get(routes::worker_status))
        .route("/worker/check", get(routes::worker_check))
        .route("/worker/stop", post(routes::worker_stop))
        // System
        .route("/health", get(routes::health_check))
        .route("/events", get(routes::event_stream))
        .route("/openapi.json", get(routes::openapi_spec));

    let router = Router::new().nest("/api/v1", api);

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.api.enable_swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    // CORS is always applied; the origin list narrows it when configured
    router.layer(build_cors_layer(&config.api.cors_origins))
}

/// Build a CORS layer based on configured origins
///
/// An empty list (or an explicit "*") allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Creates a TCP listener, binds it to the configured address, and serves the
/// router until shutdown.
pub async fn start_api_server(vault: Arc<MediaVault>, config: Arc<Config>) -> Result<()> {
    let bind_addr = config.api.bind_addr;

    let app = create_router(vault, config);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_addr, "API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
