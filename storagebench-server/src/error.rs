//! Error types for the HTTP host.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use storagebench_service::Error as BenchError;
use thiserror::Error;

/// Error type for API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The invocation failed before any measurement could be taken.
    #[error("invocation failed: {0}")]
    Invocation(#[from] BenchError),

    /// The request body could not be parsed.
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Invocation(BenchError::InvalidRequest(msg)) | ApiError::BadRequest(msg) => {
                tracing::debug!("bad request: {}", msg);
                StatusCode::BAD_REQUEST
            }
            ApiError::Invocation(err) => {
                tracing::error!(
                    error = err as &dyn std::error::Error,
                    "invocation failed"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
