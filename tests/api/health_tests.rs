//! Health and metrics endpoints

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};

use crate::common::*;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health/live", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_database_outage() {
    let app = TestApp::new().await;
    let _rx = connect(&app.registry, 42, ALICE);

    let (status, body) = app.request(Method::GET, "/health/ready", None, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["database"]["status"], "unhealthy");
    assert_eq!(body["checks"]["gateway"]["active_connections"], 1);
    assert_eq!(body["checks"]["gateway"]["active_threads"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new().await;
    let _rx = connect(&app.registry, 7, BOB);

    let (status, body) = app
        .send(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("thread_chat_websocket_connections_active"));
}
