#![allow(dead_code)]

pub mod mock_gateway;
pub mod mock_provider;

use std::sync::Arc;
use std::time::Duration;

use api_server::http::{AppState, SessionRegistry, build_router};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use shared::config::SessionConfig;
use shared::llm::LlmGateway;
use tower::ServiceExt;

pub const TEST_MAX_DATASET_BYTES: usize = 4 * 1024;
pub const TEST_SESSION_IDLE_TTL: Duration = Duration::from_secs(300);

pub fn build_test_router(gateway: Arc<dyn LlmGateway>) -> Router {
    build_test_router_with(gateway, SessionConfig::default(), 16)
}

pub fn build_test_router_with(
    gateway: Arc<dyn LlmGateway>,
    session_config: SessionConfig,
    max_sessions: usize,
) -> Router {
    build_router(AppState {
        sessions: SessionRegistry::new(max_sessions, TEST_SESSION_IDLE_TTL),
        gateway,
        session_config,
        max_dataset_bytes: TEST_MAX_DATASET_BYTES,
    })
}

pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).expect("request should build");
    send(app, request).await
}

pub async fn send_csv(app: &Router, uri: &str, csv: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(csv.into())
        .expect("request should build");
    send(app, request).await
}

pub async fn create_session(app: &Router) -> String {
    let (status, body) = send_json(app, Method::POST, "/v1/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"]
        .as_str()
        .expect("session id should be a string")
        .to_string()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body should be json")
    };

    (status, body)
}
