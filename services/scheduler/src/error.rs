//! Custom error types for the scheduling API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::SchedulingError;
use serde_json::json;
use thiserror::Error;

/// Custom error type for the scheduling API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unauthorized access
    #[error("Unauthorized")]
    Unauthorized,

    /// Domain error from the scheduling core
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            ApiError::Scheduling(err) => match err {
                SchedulingError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_error", msg)
                }
                SchedulingError::NotFound(what) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("{what} not found"),
                ),
                SchedulingError::Authorization(msg) => {
                    (StatusCode::FORBIDDEN, "authorization_error", msg)
                }
                SchedulingError::InvalidState(msg) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", msg)
                }
                // retryable: the caller should re-fetch slots and try again
                SchedulingError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
                SchedulingError::Internal(msg) => {
                    tracing::error!("internal error: {msg}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "Internal server error".to_string(),
                    )
                }
                SchedulingError::Database(e) => {
                    tracing::error!("database error: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "code": code,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn scheduling_errors_map_to_distinct_statuses() {
        assert_eq!(
            status_of(SchedulingError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SchedulingError::NotFound("meeting").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SchedulingError::Authorization("nope".into()).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(SchedulingError::InvalidState("done".into()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(SchedulingError::Conflict("taken".into()).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn conflict_is_distinguishable_from_validation() {
        let conflict = status_of(SchedulingError::Conflict("taken".into()).into());
        let validation = status_of(SchedulingError::Validation("bad".into()).into());
        assert_ne!(conflict, validation);
    }
}
