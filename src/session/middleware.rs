use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::errors::AuthError;
use crate::shared::{AppError, AppState};

/// Bearer-token middleware for protected routes.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), session::jwt_auth))
/// Handlers can then extract Extension(claims): Extension<AccessTokenClaims>.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            warn!("Missing or malformed Authorization header");
            AuthError::MissingToken
        })?
        .to_owned();

    let claims = state.session_service.authorize(&token).await?;

    debug!(
        user_id = claims.user_id,
        role = %claims.role,
        "Bearer token accepted"
    );

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
