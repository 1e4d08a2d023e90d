use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::{
    ChatMessage, LlmGateway, LlmGatewayError, LlmGatewayRequest, OpenAiGateway,
    OpenAiGatewayConfig,
};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_payloads: Arc<Mutex<Vec<Value>>>,
    seen_auth_headers: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_payloads: Arc::new(Mutex::new(Vec::new())),
            seen_auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn sends_messages_at_temperature_zero_and_parses_content() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("gpt-3.5-turbo-0125", json!("Sales fell in April.")),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiGateway::new(config_for(url, 0)).expect("gateway should build");
    let response = gateway
        .generate(sales_request())
        .await
        .expect("completion should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response.content, "Sales fell in April.");
    assert_eq!(response.model, "gpt-3.5-turbo-0125");
    assert_eq!(response.provider_request_id.as_deref(), Some("chatcmpl-1"));
    assert_eq!(
        response.usage.map(|usage| usage.total_tokens),
        Some(20)
    );

    let payloads = state.seen_payloads.lock().await.clone();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["model"], "test-model");
    assert_eq!(payloads[0]["temperature"], 0);
    assert_eq!(payloads[0]["user"], "session-1");
    assert_eq!(payloads[0]["messages"][0]["role"], "system");
    assert_eq!(payloads[0]["messages"][1]["role"], "user");
    assert_eq!(
        payloads[0]["messages"][1]["content"],
        "Average sales: 1245, April sales down 15%"
    );

    let seen_auth_headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(seen_auth_headers, vec!["Bearer test-openai-key".to_string()]);
}

#[tokio::test]
async fn fails_once_without_retrying_by_default() {
    let state = TestServerState::with_replies(vec![
        provider_error_reply(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
        MockReply {
            status: StatusCode::OK,
            body: success_response_body("test-model", json!("unused")),
        },
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiGateway::new(config_for(url, 0)).expect("gateway should build");
    let err = gateway
        .generate(sales_request())
        .await
        .expect_err("first failure should surface");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmGatewayError::ProviderFailure(ref message) if message.contains("status=503")),
        "expected provider failure, got {err:?}"
    );
    assert_eq!(state.seen_payloads.lock().await.len(), 1);
}

#[tokio::test]
async fn retries_transient_failures_when_configured() {
    let state = TestServerState::with_replies(vec![
        provider_error_reply(StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
        provider_error_reply(StatusCode::BAD_GATEWAY, "upstream_gateway"),
        MockReply {
            status: StatusCode::OK,
            body: success_response_body("test-model", json!("Recovered.")),
        },
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiGateway::new(config_for(url, 2)).expect("gateway should build");
    let response = gateway
        .generate(sales_request())
        .await
        .expect("request should succeed after retries");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response.content, "Recovered.");
    assert_eq!(state.seen_payloads.lock().await.len(), 3);
}

#[tokio::test]
async fn does_not_retry_unauthorized_provider_error() {
    let state = TestServerState::with_replies(vec![provider_error_reply(
        StatusCode::UNAUTHORIZED,
        "invalid_api_key",
    )]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiGateway::new(config_for(url, 3)).expect("gateway should build");
    let err = gateway
        .generate(sales_request())
        .await
        .expect_err("unauthorized errors should fail immediately");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(
        err,
        LlmGatewayError::ProviderFailure("status=401 code=invalid_api_key".to_string())
    );
    assert_eq!(state.seen_payloads.lock().await.len(), 1);
}

#[tokio::test]
async fn rejects_empty_completion_content() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("test-model", json!("   ")),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiGateway::new(config_for(url, 2)).expect("gateway should build");
    let err = gateway
        .generate(sales_request())
        .await
        .expect_err("empty content should be rejected");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(
        err,
        LlmGatewayError::InvalidProviderPayload("empty_content".to_string())
    );
    assert_eq!(state.seen_payloads.lock().await.len(), 1);
}

fn sales_request() -> LlmGatewayRequest {
    LlmGatewayRequest::new(vec![
        ChatMessage::system("You are a data analysis expert."),
        ChatMessage::user("Average sales: 1245, April sales down 15%"),
    ])
    .with_requester_id("session-1")
}

fn config_for(chat_completions_url: String, max_retries: u32) -> OpenAiGatewayConfig {
    OpenAiGatewayConfig {
        chat_completions_url,
        api_key: "test-openai-key".to_string(),
        model: "test-model".to_string(),
        timeout_ms: 5_000,
        max_retries,
        retry_base_backoff_ms: 0,
    }
}

fn success_response_body(model: &str, content: Value) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": model,
        "choices": [
            {
                "message": {
                    "role": "assistant",
                    "content": content
                }
            }
        ],
        "usage": {
            "prompt_tokens": 12,
            "completion_tokens": 8,
            "total_tokens": 20
        }
    })
}

fn provider_error_reply(status: StatusCode, code: &str) -> MockReply {
    MockReply {
        status,
        body: json!({
            "error": {
                "code": code
            }
        }),
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/v1/chat/completions", post(test_chat_completions_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (
        format!("http://{local_addr}/v1/chat/completions"),
        shutdown_tx,
        server_task,
    )
}

async fn test_chat_completions_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_payloads.lock().await.push(payload);

    if let Some(value) = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
    {
        state.seen_auth_headers.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({
            "error": {
                "code": "unexpected_request"
            }
        }),
    });

    (reply.status, Json(reply.body))
}
