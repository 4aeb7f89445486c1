use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Typed failure taxonomy for the service layer.
///
/// Logic failures (bad input, missing rows, ownership violations) map to 4xx
/// responses. Store-availability failures are kept distinct (`Store`) and map
/// to 503 so callers can tell a wrong request from an unavailable backend —
/// a streak endpoint never returns a silently wrong count.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid or missing bearer token")]
    Unauthorized,

    /// Authenticated, but the resource belongs to someone else.
    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    /// Illegal state transition, e.g. completing an already-finished session.
    #[error("{0}")]
    InvalidState(String),

    /// Uniqueness conflict on a user-facing write (e.g. duplicate email).
    /// Grant-ledger conflicts never surface here — see `GrantOutcome`.
    #[error("{0}")]
    Conflict(String),

    /// I/O failure from the underlying store. Not retried here; retry policy
    /// belongs to the caller.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidState(_) => StatusCode::CONFLICT,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Don't leak store internals to clients; the detail is logged.
            ServiceError::Store(e) => {
                error!(err = %e, "store failure");
                "service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
