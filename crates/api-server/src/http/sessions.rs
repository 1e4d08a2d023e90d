use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::dataset::SummaryOutcome;
use shared::llm::AssistantAction;
use shared::models::{
    CreateSessionResponse, DatasetLoadedResponse, DatasetView, FollowUpRequest, InsightsRequest,
    InterpretRequest, OkResponse, SessionView, TurnResponse, TurnView,
};
use shared::session::run_completion;
use tracing::{error, info};
use uuid::Uuid;

use super::AppState;
use super::errors::{
    bad_request_response, dataset_too_large_response, insufficient_data_response,
    internal_error_response, not_found_response, registry_error_response,
    session_error_response,
};
use super::registry::{SharedController, lock_controller};

pub(super) async fn create_session(State(state): State<AppState>) -> Response {
    match state.sessions.create(state.session_config.clone()) {
        Ok(session_id) => {
            info!(%session_id, active_sessions = state.sessions.len(), "session created");
            (StatusCode::CREATED, Json(CreateSessionResponse { session_id })).into_response()
        }
        Err(err) => registry_error_response(err),
    }
}

pub(super) async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let controller = match lookup(&state, &session_id) {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    let view = SessionView::from(&*lock_controller(&controller));
    (StatusCode::OK, Json(view)).into_response()
}

pub(super) async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let Ok(session_id) = Uuid::parse_str(&session_id) else {
        return not_found_response();
    };

    match state.sessions.remove(session_id) {
        Ok(()) => {
            info!(%session_id, "session ended");
            (StatusCode::OK, Json(OkResponse { ok: true })).into_response()
        }
        Err(err) => registry_error_response(err),
    }
}

pub(super) async fn load_dataset(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let controller = match lookup(&state, &session_id) {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return dataset_too_large_response(state.max_dataset_bytes);
        }
        Err(rejection) => {
            return bad_request_response("validation_failed", &rejection.body_text());
        }
    };
    if body.len() > state.max_dataset_bytes {
        return dataset_too_large_response(state.max_dataset_bytes);
    }

    let outcome = lock_controller(&controller).load_dataset_bytes(&body);
    match outcome {
        Ok(SummaryOutcome::Ready(summary)) => (
            StatusCode::OK,
            Json(DatasetLoadedResponse {
                dataset: DatasetView::from(&summary),
            }),
        )
            .into_response(),
        Ok(SummaryOutcome::InsufficientData { .. }) => insufficient_data_response(),
        Err(err) => session_error_response(err),
    }
}

pub(super) async fn interpret(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<InterpretRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request_response("validation_failed", &rejection.body_text()),
    };

    submit(state, &session_id, AssistantAction::Interpret, Some(request.text)).await
}

pub(super) async fn generate_insights(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<InsightsRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request_response("validation_failed", &rejection.body_text()),
    };

    submit(state, &session_id, AssistantAction::Insights, request.text).await
}

pub(super) async fn ask_follow_up(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request_response("validation_failed", &rejection.body_text()),
    };

    submit(state, &session_id, AssistantAction::FollowUp, Some(request.text)).await
}

pub(super) async fn clear(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let controller = match lookup(&state, &session_id) {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    let cleared = lock_controller(&controller).clear();
    match cleared {
        Ok(()) => (StatusCode::OK, Json(OkResponse { ok: true })).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(super) async fn acknowledge(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let controller = match lookup(&state, &session_id) {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    lock_controller(&controller).acknowledge();
    (StatusCode::OK, Json(OkResponse { ok: true })).into_response()
}

fn lookup(state: &AppState, session_id: &str) -> Result<SharedController, Response> {
    let session_id = Uuid::parse_str(session_id).map_err(|_| not_found_response())?;
    state
        .sessions
        .get(session_id)
        .map_err(registry_error_response)
}

/// Starts the submission under the session lock, then drives the completion on its
/// own task so a dropped client connection cannot strand the session mid-flight.
async fn submit(
    state: AppState,
    session_id: &str,
    action: AssistantAction,
    text: Option<String>,
) -> Response {
    let controller = match lookup(&state, session_id) {
        Ok(controller) => controller,
        Err(response) => return response,
    };

    let begun = lock_controller(&controller).begin_submission(action, text.as_deref());
    let pending = match begun {
        Ok(pending) => pending,
        Err(err) => return session_error_response(err),
    };

    let gateway = Arc::clone(&state.gateway);
    let timeout = state.session_config.completion_timeout();
    let completion = tokio::spawn(async move {
        let result = run_completion(gateway.as_ref(), &pending, timeout).await;

        let mut guard = lock_controller(&controller);
        let outcome = guard.finish_submission(pending, result);
        if outcome.is_err() {
            guard.acknowledge();
        }
        let turn_count = guard.transcript().len();
        outcome.map(|turn| TurnResponse {
            turn: TurnView::from_turn(1, &turn),
            turn_count,
        })
    });

    match completion.await {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(err)) => session_error_response(err),
        Err(err) => {
            error!("completion task failed: {err}");
            internal_error_response()
        }
    }
}
