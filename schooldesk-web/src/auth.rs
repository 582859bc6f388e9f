//! Authentication: credential directory and the login flow
//!
//! The directory resolves credentials to a login identity; starting and
//! ending sessions is left to the session lifecycle manager.

pub mod handlers;
pub mod users;

pub use users::{Account, UserDirectory};

use axum::http::StatusCode;

/// Minimum length of a new password
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("The current password is incorrect")]
    WrongCurrentPassword,
    #[error("The new password must be at least {0} characters long")]
    PasswordTooShort(usize),
    #[error("The new password must differ from the current one")]
    PasswordReused,
    #[error("The new passwords do not match")]
    PasswordMismatch,
    #[error("Account not found")]
    UnknownAccount,
    #[error("Password hashing failed")]
    Hashing,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::WrongCurrentPassword => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::MissingCredentials
            | AuthError::PasswordTooShort(_)
            | AuthError::PasswordReused
            | AuthError::PasswordMismatch => StatusCode::BAD_REQUEST,
            AuthError::UnknownAccount => StatusCode::NOT_FOUND,
            AuthError::Hashing => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
