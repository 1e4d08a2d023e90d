use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::{ErrorBody, ErrorResponse};
use shared::session::SessionError;
use tracing::{error, warn};

use super::registry::RegistryError;

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        }),
    )
        .into_response()
}

pub(super) fn bad_request_response(code: &str, message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, code, message)
}

pub(super) fn not_found_response() -> Response {
    error_response(StatusCode::NOT_FOUND, "not_found", "Session not found")
}

pub(super) fn dataset_too_large_response(max_bytes: usize) -> Response {
    error_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        "dataset_too_large",
        &format!("Dataset upload exceeds {max_bytes} bytes"),
    )
}

pub(super) fn insufficient_data_response() -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "insufficient_data",
        "Dataset has no rows without missing values",
    )
}

pub(super) fn internal_error_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Unexpected server error",
    )
}

pub(super) fn registry_error_response(err: RegistryError) -> Response {
    match err {
        RegistryError::NotFound => not_found_response(),
        RegistryError::LimitReached { max_sessions } => {
            warn!(max_sessions, "session limit reached");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "session_limit_reached",
                "Too many active sessions; retry later",
            )
        }
    }
}

pub(super) fn session_error_response(err: SessionError) -> Response {
    match err {
        SessionError::Validation(err) => {
            bad_request_response("validation_failed", &err.to_string())
        }
        SessionError::DataFormat(err) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_dataset",
            &err.to_string(),
        ),
        SessionError::Busy => error_response(
            StatusCode::CONFLICT,
            "session_busy",
            "A completion is already in progress for this session",
        ),
        SessionError::Completion(err) => error_response(
            StatusCode::BAD_GATEWAY,
            "completion_failed",
            &err.to_string(),
        ),
        SessionError::StaleCompletion => {
            error!("completion resolved against a different submission");
            internal_error_response()
        }
    }
}
