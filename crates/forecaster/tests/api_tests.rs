//! Integration tests for the forecaster API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cadvisor_forecaster::api::{create_router, AppState};
use forecaster_lib::{
    health::{components, HealthRegistry},
    observability::ForecasterMetrics,
    predictor::FallbackReason,
};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SOURCE).await;
    health_registry.register(components::SINK).await;
    health_registry.register(components::ENGINE).await;

    let state = Arc::new(AppState::new(health_registry, ForecasterMetrics::new()));
    (create_router(state.clone()), state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["source"].is_object());
    assert!(health["components"]["sink"].is_object());
    assert!(health["components"]["engine"].is_object());
}

#[tokio::test]
async fn test_healthz_ok_when_pushgateway_degraded() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .record(components::SINK, 3, 15, "pushes")
        .await;

    let (status, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["sink"]["message"], "3 of 15 pushes failed");
    assert_eq!(health["components"]["sink"]["failed"], 3);
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .record(components::ENGINE, 4, 4, "fits")
        .await;

    let (status, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_503_before_first_pass() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_ok_when_ready() {
    let (app, state) = setup_test_app().await;
    state.health_registry.mark_pass_complete(1_700_000_000).await;

    let (status, body) = get(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_readyz_503_when_ready_but_unhealthy() {
    let (app, state) = setup_test_app().await;
    state.health_registry.mark_pass_complete(1_700_000_000).await;
    state
        .health_registry
        .record(components::SOURCE, 15, 15, "range queries")
        .await;

    let (status, body) = get(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["reason"], "Unhealthy: source");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_forecaster_metrics() {
    let (app, state) = setup_test_app().await;
    state.metrics.observe_pass_latency(1.2);
    state.metrics.observe_fit_latency(0.003);
    state.metrics.inc_published();
    state.metrics.inc_fallback(&FallbackReason::NoSeries);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("cadvisor_forecaster_pass_latency_seconds_bucket"));
    assert!(text.contains("cadvisor_forecaster_fit_latency_seconds_count"));
    assert!(text.contains("cadvisor_forecaster_forecasts_published_total"));
    assert!(text.contains(r#"cadvisor_forecaster_fallbacks_total{reason="no_series"}"#));
}
