//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError as MailError;
use crate::services::token::TokenError;

/// Errors from the authentication flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A live user already owns this email.
    #[error("User already exists")]
    UserAlreadyExists,

    /// No live user owns this email.
    #[error("User not found")]
    UserNotFound,

    /// Absent, expired, or mismatched verification code. Deliberately
    /// indistinguishable between those cases.
    #[error("Invalid request data")]
    InvalidRequest,

    /// Structural validation failure; carries the first violation.
    #[error("{0}")]
    Validation(String),

    /// Malformed email address.
    #[error("Invalid email format")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Password could not be hashed.
    #[error("Password hashing failed")]
    PasswordHash,

    /// Token issue or validation failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Database operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Mail could not be sent.
    #[error("Email error: {0}")]
    Mail(#[from] MailError),

    /// Stored payload failed to round-trip.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
