//! Unified error handling for the daemon.
//!
//! Engine rejections, persistence failures and request-shape problems all
//! funnel into [`ApiError`], which knows its HTTP status, a stable code for
//! metrics labeling, and how to render itself as a JSON response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use roster_engine::EngineError;
use thiserror::Error;

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An engine rule rejected the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("staff role required")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Db(#[from] crate::db::DbError),

    /// The session actor went away mid-request (shutdown or delete race).
    #[error("session is no longer available")]
    SessionGone,
}

impl ApiError {
    /// Stable code string, used both in response bodies and metric labels.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Engine(e) => e.error_code(),
            ApiError::UnknownUser(_) => "unknown_user",
            ApiError::UnknownSession(_) => "unknown_session",
            ApiError::Forbidden => "forbidden",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Db(_) => "db",
            ApiError::SessionGone => "session_gone",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Engine(_) => StatusCode::CONFLICT,
            ApiError::UnknownUser(_) | ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Db(_) | ApiError::SessionGone => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }
        crate::metrics::record_rejection(code);
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": code,
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_code() {
        let err = ApiError::from(EngineError::ArrivalTooLate);
        assert_eq!(err.error_code(), "arrival_too_late");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_participant_maps_to_not_found() {
        let err = ApiError::from(EngineError::NotFound("u1".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
