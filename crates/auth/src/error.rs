use store::StoreError;
use thiserror::Error;

/// Errors from logging in and resolving tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    /// Unknown email and wrong password are reported the same way.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Email {0} is already registered")]
    EmailTaken(String),

    /// The remote auth service could not answer.
    #[error("Authentication service unavailable: {0}")]
    Unavailable(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
