use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

use crate::session::{errors::AuthError, service::SessionService};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
}

impl AppState {
    pub fn new(session_service: Arc<SessionService>) -> Self {
        Self { session_service }
    }
}

/// Failure reported by a repository implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Transport-level error: every variant maps to an HTTP status and a machine-readable code
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::UserNotFound
                | AuthError::MissingToken
                | AuthError::TokenRevoked => StatusCode::UNAUTHORIZED,
                AuthError::AccountInactive | AuthError::Unauthorized => StatusCode::FORBIDDEN,
                AuthError::Duplicate(_) => StatusCode::CONFLICT,
                AuthError::Storage(_) | AuthError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(err) => match err {
                AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                AuthError::AccountInactive => "ACCOUNT_INACTIVE",
                AuthError::InvalidToken => "INVALID_TOKEN",
                AuthError::TokenExpired => "TOKEN_EXPIRED",
                AuthError::UserNotFound => "USER_NOT_FOUND",
                AuthError::MissingToken | AuthError::TokenRevoked => "UNAUTHORIZED_ACCESS",
                AuthError::Unauthorized => "FORBIDDEN_ACCESS",
                AuthError::Duplicate(_) => "DUPLICATE_DATA",
                AuthError::Storage(_) | AuthError::Internal(_) => "INTERNAL_SERVER_ERROR",
            },
        }
    }

    /// Message safe to show to clients; storage and internal details stay in the logs
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Auth(AuthError::Duplicate(_)) => "Data already exists".to_string(),
            AppError::Auth(AuthError::Storage(_) | AuthError::Internal(_)) => {
                "An unexpected error occurred".to_string()
            }
            AppError::Auth(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code = %code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = %code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.client_message(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// JSON body extractor that runs `validator` rules before the handler sees the payload.
/// Malformed JSON and rule violations are both reported as `VALIDATION_ERROR`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
