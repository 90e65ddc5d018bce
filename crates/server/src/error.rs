//! Unified error handling.
//!
//! Provides a unified `AppError` type rendered as a `{message, status}` JSON
//! body, capturing server-class errors to Sentry before responding. All route
//! handlers return `Result<T, AppError>`; only the first validation failure
//! encountered is surfaced.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::token::TokenError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication flow failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Token could not be decoded or validated.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Entity missing or soft-deleted.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unique entity already present.
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// Malformed or structurally invalid request; carries the first
    /// validation failure.
    #[error("{0}")]
    InvalidRequest(String),

    /// Missing or unusable credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but lacking the required role or ownership.
    #[error("Unauthorized access")]
    Forbidden,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Uniform error body: `{"message": ..., "status": ...}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    status: u16,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::Token(_) => StatusCode::UNAUTHORIZED,
                AuthError::Repository(_)
                | AuthError::PasswordHash
                | AuthError::Mail(_)
                | AuthError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Token(_) | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Repository(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details are not exposed.
    fn message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                // Mail-send failures read as a generic internal error too
                AuthError::Repository(_)
                | AuthError::PasswordHash
                | AuthError::Serialization(_)
                | AuthError::Mail(_) => "Internal server error".to_owned(),
                other => other.to_string(),
            },
            Self::Repository(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Token(_) => "Invalid or expired token".to_owned(),
            other => other.to_string(),
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Repository(_)
                | Self::Internal(_)
                | Self::Auth(
                    AuthError::Repository(_)
                        | AuthError::PasswordHash
                        | AuthError::Mail(_)
                        | AuthError::Serialization(_)
                )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = ErrorBody {
            message: self.message(),
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(get_status(AppError::NotFound("user")), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(AppError::AlreadyExists("category")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::InvalidRequest("bad".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_status_codes() {
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::UserAlreadyExists)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::UserNotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidRequest)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Token(crate::services::token::TokenError::Expired)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = AppError::Internal("connection string postgres://user:pw@host".to_owned());
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_code_mismatch_and_absence_read_identically() {
        // Both halves of the verification lookup fail with the same message.
        let err = AppError::Auth(AuthError::InvalidRequest);
        assert_eq!(err.message(), "Invalid request data");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
