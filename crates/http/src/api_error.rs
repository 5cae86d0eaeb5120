//! Typed API error for HTTP handlers.
//!
//! Converts service errors into proper HTTP responses with JSON body and
//! status codes. A scoped lookup that misses always comes out as 404 here,
//! never as an unhandled fault.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use pipeline_service::ServiceError;
use pipeline_storage::StorageError;

/// API error with HTTP status code and human-readable message.
///
/// Use via `Result<Json<T>, ApiError>` in handlers.
/// Converts to JSON response: `{"error": "message"}`.
///
/// `Internal` logs the real error server-side and returns a static message
/// to the client — no error detail leakage.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request — invalid input from caller.
    BadRequest(String),
    /// 401 Unauthorized — missing or unknown identity header.
    Unauthorized(String),
    /// 404 Not Found — requested record doesn't exist under this scope.
    NotFound(String),
    /// 422 Unprocessable Entity — persist rejected by validation.
    UnprocessableEntity(String),
    /// 500 Internal Server Error — unexpected failure. Details logged, not exposed.
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            },
        };
        let body = serde_json::json!({"error": message});
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(StorageError::NotFound { entity, id }) => {
                Self::NotFound(format!("{entity} '{id}' not found"))
            },
            ServiceError::Storage(ref e) if e.is_duplicate() => {
                Self::UnprocessableEntity(err.to_string())
            },
            ServiceError::Validation(errors) => Self::UnprocessableEntity(errors.to_string()),
            ServiceError::InvalidInput(msg) => Self::BadRequest(msg),
            ServiceError::Storage(e) => Self::Internal(anyhow::Error::new(e)),
        }
    }
}
