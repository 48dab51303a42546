use axum::{extract::State, Extension, Json};
use tracing::{info, instrument};

use super::{
    token::AccessTokenClaims,
    types::{
        LoginRequest, LoginResponse, LogoutResponse, ProfileResponse, RefreshTokenRequest,
        RefreshTokenResponse,
    },
};
use crate::shared::{AppError, AppState, ValidatedJson};

/// POST /auth/login
#[instrument(name = "login", skip_all, fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = state
        .session_service
        .authenticate(&request.username, &request.password)
        .await?;

    info!(user_id = response.user.id, "Login succeeded");
    Ok(Json(response))
}

/// POST /auth/refresh-token
#[instrument(name = "refresh_token", skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, AppError> {
    let response = state.session_service.renew(&request.refresh_token).await?;
    Ok(Json(response))
}

/// POST /auth/logout (bearer)
#[instrument(name = "logout", skip_all, fields(user_id = claims.user_id))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<LogoutResponse>, AppError> {
    state
        .session_service
        .revoke(
            &request.refresh_token,
            &claims.jti,
            claims.expires_at(),
            claims.user_id,
        )
        .await?;

    Ok(Json(LogoutResponse::terminated()))
}

/// GET /auth/me (bearer)
#[instrument(name = "me", skip_all, fields(user_id = claims.user_id))]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.session_service.get_profile(claims.user_id).await?;
    Ok(Json(profile))
}
