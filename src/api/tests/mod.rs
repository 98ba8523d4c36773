use super::*;
use crate::db::NewPost;
use crate::types::CrawlStatus;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Router backed by a vault with tempdir storage and the given worker URL
async fn test_router(worker_url: &str) -> (Router, Arc<MediaVault>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.worker.base_url = worker_url.to_string();
    config.worker.poll_interval = Duration::from_millis(50);
    config.worker.wait_budget = Duration::from_millis(300);
    config.storage.database_path = temp_dir.path().join("test.db");
    config.storage.media_dir = temp_dir.path().join("media");
    config.resolver.lookup_url = None;

    let vault = Arc::new(MediaVault::new(config).await.unwrap());
    let router = create_router(vault.clone(), vault.config.clone());
    (router, vault, temp_dir)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_ok_with_version() {
    let (router, _vault, _guard) = test_router("http://127.0.0.1:1").await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn missing_post_is_404_with_error_envelope() {
    let (router, _vault, _guard) = test_router("http://127.0.0.1:1").await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts/doesnotexist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn stored_post_round_trips_through_api() {
    let (router, vault, _guard) = test_router("http://127.0.0.1:1").await;

    vault
        .db
        .insert_post(&NewPost {
            note_id: "abc123".into(),
            title: "Stored".into(),
            note_type: "normal".into(),
            author_id: "u1".into(),
            author_name: "author".into(),
            tags: Some("a,b".into()),
            source_url: "https://example.com/p".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts/abc123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["note_id"], "abc123");
    assert_eq!(body["author"]["name"], "author");
    assert_eq!(body["tags"], json!(["a", "b"]));
    assert_eq!(body["comments"], json!([]));
}

#[tokio::test]
async fn invalid_crawl_url_returns_failed_report_not_http_error() {
    let (router, _vault, _guard) = test_router("http://127.0.0.1:1").await;

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/crawl/xhs")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url": "definitely not a post link"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    // Taxonomy outcomes fold into the uniform report at HTTP 200
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert!(body["message"].as_str().unwrap().contains("post link"));
}

#[tokio::test]
async fn worker_status_passthrough() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crawler/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "idle"})))
        .mount(&server)
        .await;

    let (router, _vault, _guard) = test_router(&server.uri()).await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/worker/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn unreachable_worker_status_is_502() {
    let (router, _vault, _guard) = test_router("http://127.0.0.1:1").await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/worker/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "worker_unreachable");
}

#[tokio::test]
async fn worker_check_never_errors() {
    let (router, _vault, _guard) = test_router("http://127.0.0.1:1").await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/worker/check")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["connected"], false);
}

#[tokio::test]
async fn crawl_report_shape_matches_contract() {
    // Busy worker: report must carry status + message, no data
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crawler/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
        .mount(&server)
        .await;

    let (router, _vault, _guard) = test_router(&server.uri()).await;

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/crawl/bili")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url": "BV17x411w7KC"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], serde_json::to_value(CrawlStatus::Failed).unwrap());
    assert!(body["message"].is_string());
    assert!(body.get("data").is_none());
}
