//! Error taxonomy and its mapping onto HTTP responses.
//!
//! The first five variants are rejected before any row is touched, so
//! they never leave partial state behind. `Database` means a write or
//! read failed after validation; the unit of work has already rolled
//! back and the caller may retry.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// No valid session or token (401)
    #[error("authentication: {0}")]
    Authentication(String),

    /// Wrong role or wrong ownership (403)
    #[error("authorization: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    /// Invalid state transition, e.g. borrowing a book already on loan (409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store failure after validation passed; already rolled back (503)
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// JSON body every error renders to
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Database(_) => (StatusCode::SERVICE_UNAVAILABLE, "persistence_failure"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    /// User-facing message. Store and internal faults are logged with
    /// their detail and reported generically.
    fn message(&self) -> String {
        match self {
            AppError::Database(e) => {
                tracing::error!(error = ?e, "database failure");
                "Storage temporarily unavailable, please retry".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                "Internal server error".to_string()
            }
            AppError::Authentication(m)
            | AppError::Authorization(m)
            | AppError::NotFound(m)
            | AppError::Validation(m)
            | AppError::Conflict(m) => m.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status();
        let message = self.message();

        let body = Json(ErrorResponse {
            error: kind.to_string(),
            message,
        });
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_their_status_codes() {
        let cases = [
            (
                AppError::Authentication("no token".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::Authorization("wrong role".into()),
                StatusCode::FORBIDDEN,
            ),
            (AppError::NotFound("book 7".into()), StatusCode::NOT_FOUND),
            (
                AppError::Validation("title required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Conflict("already borrowed".into()),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn persistence_failure_is_retryable_not_fatal() {
        let err = AppError::Database(sqlx::Error::PoolClosed);
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
