//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the mediavault REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the mediavault REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "mediavault REST API",
        version = "0.2.0",
        description = "REST API for driving the media-crawl worker and querying locally archived posts and videos",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8590", description = "Local development server")
    ),
    paths(
        // Crawling
        crate::api::routes::crawl_post,
        crate::api::routes::crawl_video,

        // Stored records
        crate::api::routes::get_post,
        crate::api::routes::get_video,

        // Worker
        crate::api::routes::worker_status,
        crate::api::routes::worker_check,
        crate::api::routes::worker_stop,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(
        schemas(
            crate::types::Platform,
            crate::types::CrawlStatus,
            crate::types::CrawlReport,
            crate::types::IngestSummary,
            crate::types::WorkerState,
            crate::types::WorkerStatus,
            crate::types::WorkerLogEntry,
            crate::worker::ConnectionCheck,
            crate::error::ApiError,
            crate::error::ErrorDetail,
            crate::api::routes::CrawlUrlRequest,
            crate::api::routes::PostResponse,
            crate::api::routes::PostImageResponse,
            crate::api::routes::VideoResponse,
            crate::api::routes::AuthorResponse,
        )
    ),
    tags(
        (name = "crawl", description = "Crawl submission"),
        (name = "records", description = "Locally stored records"),
        (name = "worker", description = "Remote worker probes"),
        (name = "system", description = "Health, events, and documentation"),
    )
)]
pub struct ApiDoc;
