use thiserror::Error;

use super::{password::PasswordError, token::TokenError};
use crate::shared::StoreError;

/// Outcomes of the session lifecycle that are not a success.
///
/// Login never distinguishes an unknown username from a wrong password: both
/// surface as [`AuthError::InvalidCredentials`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Your account is inactive")]
    AccountInactive,

    #[error("Invalid or revoked token")]
    InvalidToken,

    #[error("Session expired, please login again")]
    TokenExpired,

    #[error("User account not found")]
    UserNotFound,

    /// A refresh token owned by someone else was submitted for logout
    #[error("You cannot logout another user's session")]
    Unauthorized,

    #[error("Missing or invalid authorization header")]
    MissingToken,

    #[error("Token has been logged out")]
    TokenRevoked,

    #[error("Duplicate data: {0}")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(detail) => AuthError::Duplicate(detail),
            StoreError::Backend(detail) => AuthError::Storage(detail),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Malformed(_) | TokenError::BadSignature => AuthError::InvalidToken,
            TokenError::Encoding(detail) => AuthError::Internal(detail),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
