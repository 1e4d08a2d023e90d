use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

/// Minimal OpenAI-compatible chat-completions server on an ephemeral port.
pub struct MockProvider {
    pub url: String,
    pub seen_payloads: Arc<Mutex<Vec<Value>>>,
    shutdown_tx: oneshot::Sender<()>,
    server_task: tokio::task::JoinHandle<()>,
}

#[derive(Clone)]
struct ProviderState {
    replies: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
    seen_payloads: Arc<Mutex<Vec<Value>>>,
}

impl MockProvider {
    pub async fn start(replies: Vec<(StatusCode, Value)>) -> Self {
        let state = ProviderState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_payloads: Arc::new(Mutex::new(Vec::new())),
        };
        let seen_payloads = state.seen_payloads.clone();

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let local_addr = listener
            .local_addr()
            .expect("listener address should resolve");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("mock provider should run");
        });

        Self {
            url: format!("http://{local_addr}/v1/chat/completions"),
            seen_payloads,
            shutdown_tx,
            server_task,
        }
    }

    pub async fn stop(self) {
        self.shutdown_tx
            .send(())
            .expect("shutdown signal should send");
        self.server_task.await.expect("server task should join");
    }
}

pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-e2e",
        "model": "gpt-3.5-turbo-0125",
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 30, "completion_tokens": 12, "total_tokens": 42 }
    })
}

pub fn provider_error_body(code: &str) -> Value {
    json!({ "error": { "code": code, "type": "server_error" } })
}

async fn chat_completions(
    State(state): State<ProviderState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_payloads.lock().await.push(payload);
    let (status, body) = state.replies.lock().await.pop_front().unwrap_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        provider_error_body("unexpected_request"),
    ));

    (status, Json(body))
}
