//! API error handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use detective_state::{LoadError, SubmitError};
use thiserror::Error;
use tracing::error;

use crate::handlers::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The client is rate-limited; retry after the lock TTL.
    #[error("url metric storage is locked, try again later")]
    LockConflict,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::LockConflict => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(msg) = &self {
            error!(error = %msg, "request failed");
        }
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::LockConflict => ApiError::LockConflict,
            SubmitError::Validation(e) => ApiError::BadRequest(e.to_string()),
            SubmitError::Persist(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
