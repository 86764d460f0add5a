use axum::body::Body;
use bytes::Bytes;
use chrono::{Duration, Utc};
use http::header;
use http::Request;
use http::StatusCode;
use http_body_util::BodyExt;
use instance_reaper::compute::InMemoryCompute;
use instance_reaper::config::AppConfig;
use instance_reaper::models::instance::Instance;
use instance_reaper::routes::build_router;
use instance_reaper::state::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_PROJECT: &str = "reaper-test-project";
const TEST_TRIGGER_TOKEN: &str = "trigger-token-12345";

fn test_config() -> AppConfig {
    AppConfig::for_project(TEST_PROJECT)
}

fn setup_with(config: AppConfig) -> (AppState, Arc<InMemoryCompute>) {
    let compute = Arc::new(InMemoryCompute::default());
    let state = AppState::with_backend(config, compute.clone());
    (state, compute)
}

fn setup() -> (AppState, Arc<InMemoryCompute>) {
    setup_with(test_config())
}

fn created_minutes_ago(minutes: i64) -> String {
    (Utc::now() - Duration::minutes(minutes)).to_rfc3339()
}

async fn body_to_json(body: Body) -> Value {
    let bytes: Bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn push_envelope() -> String {
    serde_json::to_string(&json!({
        "message": {
            "data": "e30=",
            "messageId": "1234567890",
            "message_id": "1234567890",
            "publishTime": "2024-05-01T12:00:00Z",
        },
        "subscription": "projects/reaper-test-project/subscriptions/cleanup",
    }))
    .unwrap()
}

fn trigger_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

// ==================== Health Tests ====================

#[tokio::test]
async fn test_health_returns_200() {
    let (state, _compute) = setup();
    let app = build_router(state);

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = body_to_json(resp.into_body()).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_status_reports_project() {
    let (state, _compute) = setup();
    let app = build_router(state);

    let req = Request::builder()
        .uri("/status")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = body_to_json(resp.into_body()).await;
    assert_eq!(body["data"]["project"], TEST_PROJECT);
    assert!(body["data"]["sweep_interval_secs"].is_null());
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let (state, _compute) = setup();
    let app = build_router(state);

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

// ==================== Trigger Tests ====================

#[tokio::test]
async fn test_trigger_deletes_expired_instance() {
    let (state, compute) = setup();
    compute
        .insert(
            Instance::new("vm-1", "us-central1-a", created_minutes_ago(45))
                .with_metadata("ttl", "30"),
        )
        .await;
    compute
        .insert(Instance::new(
            "vm-2",
            "us-central1-a",
            created_minutes_ago(10 * 365 * 24 * 60),
        ))
        .await;
    let app = build_router(state);

    let resp = app.oneshot(trigger_request("/", push_envelope())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = body_to_json(resp.into_body()).await;
    assert_eq!(body["data"]["project"], TEST_PROJECT);
    assert_eq!(body["data"]["examined"], 2);
    assert_eq!(body["data"]["deleted"][0]["name"], "vm-1");
    assert_eq!(body["data"]["deleted"][0]["zone"], "us-central1-a");
    assert!(body["error"].is_null());

    assert_eq!(
        compute.delete_calls().await,
        vec![(
            TEST_PROJECT.to_string(),
            "us-central1-a".to_string(),
            "vm-1".to_string()
        )]
    );
}

#[tokio::test]
async fn test_trigger_ignores_payload_contents() {
    let (state, _compute) = setup();
    let app = build_router(state);

    let resp = app
        .oneshot(trigger_request("/sweep", "definitely not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = body_to_json(resp.into_body()).await;
    assert_eq!(body["data"]["examined"], 0);
}

#[tokio::test]
async fn test_trigger_reports_delete_failure_as_502() {
    let (state, compute) = setup();
    compute
        .insert(
            Instance::new("vm-1", "europe-west4-a", created_minutes_ago(90))
                .with_metadata("ttl", "60"),
        )
        .await;
    compute.fail_delete_of("vm-1").await;
    let app = build_router(state);

    let resp = app.oneshot(trigger_request("/", push_envelope())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = body_to_json(resp.into_body()).await;
    assert!(body["data"].is_null());
    assert_eq!(body["error"]["code"], 502);
    assert_eq!(body["error"]["kind"], "mutation_failure");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("vm-1"));
    assert!(message.contains("europe-west4-a"));
}

#[tokio::test]
async fn test_trigger_reports_bad_timestamp_as_500() {
    let (state, compute) = setup();
    compute
        .insert(Instance::new("vm-bad", "us-east1-b", "not-a-date").with_metadata("ttl", "5"))
        .await;
    let app = build_router(state);

    let resp = app.oneshot(trigger_request("/", "{}")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = body_to_json(resp.into_body()).await;
    assert_eq!(body["error"]["kind"], "data_integrity");
    assert!(compute.delete_calls().await.is_empty());
}

#[tokio::test]
async fn test_trigger_reports_listing_failure_as_502() {
    let (state, compute) = setup();
    compute.fail_listing(true).await;
    let app = build_router(state);

    let resp = app.oneshot(trigger_request("/", "{}")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = body_to_json(resp.into_body()).await;
    assert_eq!(body["error"]["kind"], "transport");
}

#[tokio::test]
async fn test_trigger_rejects_oversized_payload() {
    let mut config = test_config();
    config.max_trigger_bytes = 16;
    let (state, _compute) = setup_with(config);
    let app = build_router(state);

    let resp = app
        .oneshot(trigger_request("/", "x".repeat(1024)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// ==================== Trigger Token Tests ====================

fn setup_with_token() -> (AppState, Arc<InMemoryCompute>) {
    let mut config = test_config();
    config.trigger_token = Some(TEST_TRIGGER_TOKEN.to_string());
    setup_with(config)
}

#[tokio::test]
async fn test_trigger_without_token_returns_401() {
    let (state, compute) = setup_with_token();
    compute
        .insert(Instance::new("vm-1", "zone", created_minutes_ago(45)).with_metadata("ttl", "30"))
        .await;
    let app = build_router(state);

    let resp = app.oneshot(trigger_request("/", "{}")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(compute.delete_calls().await.is_empty());
}

#[tokio::test]
async fn test_trigger_with_wrong_token_returns_401() {
    let (state, _compute) = setup_with_token();
    let app = build_router(state);

    let resp = app
        .oneshot(trigger_request("/?token=wrong", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_trigger_with_header_token_returns_200() {
    let (state, _compute) = setup_with_token();
    let app = build_router(state);

    let mut req = trigger_request("/sweep", "{}");
    req.headers_mut().insert(
        "x-trigger-token",
        http::HeaderValue::from_static(TEST_TRIGGER_TOKEN),
    );

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trigger_with_query_token_returns_200() {
    let (state, _compute) = setup_with_token();
    let app = build_router(state);

    let resp = app
        .oneshot(trigger_request(
            &format!("/?source=pubsub&token={TEST_TRIGGER_TOKEN}"),
            push_envelope(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trigger_with_percent_encoded_query_token_returns_200() {
    let mut config = test_config();
    config.trigger_token = Some("a+b/c=".to_string());
    let (state, _compute) = setup_with(config);
    let app = build_router(state);

    let resp = app
        .clone()
        .oneshot(trigger_request("/?token=a%2Bb%2Fc%3D", push_envelope()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // An unencoded `+` decodes to a space and does not match.
    let resp = app
        .oneshot(trigger_request("/?token=a+b/c=", push_envelope()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_does_not_require_token() {
    let (state, _compute) = setup_with_token();
    let app = build_router(state);

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
