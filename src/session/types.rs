use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::user::models::{Role, UserModel};

pub const TOKEN_TYPE: &str = "Bearer";
pub const LOGOUT_STATUS: &str = "access_terminated";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Request body for `POST /auth/login`
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Request body for `POST /auth/refresh-token` and `POST /auth/logout`
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Minimal identity returned alongside a fresh token pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUserSummary {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub role: Role,
}

impl From<&UserModel> for AuthUserSummary {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub token: TokenResponse,
    pub user: AuthUserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshTokenResponse {
    pub token_type: String,
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogoutResponse {
    pub status: String,
}

impl LogoutResponse {
    pub fn terminated() -> Self {
        Self {
            status: LOGOUT_STATUS.to_string(),
        }
    }
}

/// Profile returned by `GET /auth/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileResponse {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub phone_number: String,
    pub is_active: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

impl From<&UserModel> for ProfileResponse {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            phone_number: user.phone_number.clone(),
            is_active: user.is_active,
            created_at: user.created_at.format(TIMESTAMP_FORMAT).to_string(),
            last_login_at: user
                .last_login_at
                .map(|at| at.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}
