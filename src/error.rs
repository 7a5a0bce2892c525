//! Error types for the circulation server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes returned in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    Conflict = 8,
    BadValue = 18,
    NoSuchData = 20,
    AlreadyReturned = 22,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// A referenced book, member, author or loan does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested transition conflicts with the current state (book unavailable, duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The loan has already been returned
    #[error("Already returned: {0}")]
    AlreadyReturned(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone()),
            AppError::AlreadyReturned(msg) => {
                (StatusCode::CONFLICT, ErrorCode::AlreadyReturned, msg.clone())
            }
            AppError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::NotFound("loan 1".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("book 1".into()), StatusCode::CONFLICT),
            (AppError::AlreadyReturned("loan 1".into()), StatusCode::CONFLICT),
            (AppError::InvalidArgument("date".into()), StatusCode::BAD_REQUEST),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_message_is_not_leaked() {
        let (_, code, message) = AppError::Internal("pool exhausted".into()).parts();
        assert_eq!(code, ErrorCode::Failure);
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_already_returned_code_differs_from_conflict() {
        let (_, returned, _) = AppError::AlreadyReturned("loan 3".into()).parts();
        let (_, conflict, _) = AppError::Conflict("book 3".into()).parts();
        assert_ne!(returned, conflict);
    }
}
