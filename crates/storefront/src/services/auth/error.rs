//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] motostore_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Sign-up without a full name.
    #[error("full name is required")]
    MissingFullName,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The session's token is no longer accepted.
    #[error("session expired")]
    SessionExpired,

    /// Repository/backend error.
    #[error("backend error: {0}")]
    Repository(#[from] RepositoryError),
}
