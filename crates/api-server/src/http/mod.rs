use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use shared::config::SessionConfig;
use shared::llm::LlmGateway;

mod errors;
mod health;
mod registry;
mod sessions;

pub use registry::{RegistryError, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    pub gateway: Arc<dyn LlmGateway>,
    pub session_config: SessionConfig,
    pub max_dataset_bytes: usize,
}

pub fn build_router(app_state: AppState) -> Router {
    let dataset_body_limit = DefaultBodyLimit::max(app_state.max_dataset_bytes);

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/sessions", post(sessions::create_session))
        .route(
            "/v1/sessions/{session_id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route(
            "/v1/sessions/{session_id}/dataset",
            post(sessions::load_dataset).layer(dataset_body_limit),
        )
        .route(
            "/v1/sessions/{session_id}/interpret",
            post(sessions::interpret),
        )
        .route(
            "/v1/sessions/{session_id}/insights",
            post(sessions::generate_insights),
        )
        .route("/v1/sessions/{session_id}/ask", post(sessions::ask_follow_up))
        .route("/v1/sessions/{session_id}/clear", post(sessions::clear))
        .route(
            "/v1/sessions/{session_id}/acknowledge",
            post(sessions::acknowledge),
        )
        .with_state(app_state)
}
