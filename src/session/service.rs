use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    errors::AuthError,
    models::NewRefreshToken,
    password::CredentialVerifier,
    repository::AuthRepository,
    token::{AccessTokenClaims, TokenCodec},
    types::{
        AuthUserSummary, LoginResponse, ProfileResponse, RefreshTokenResponse, TokenResponse,
        TOKEN_TYPE,
    },
};
use crate::user::repository::UserRepository;

/// Login, renewal, logout and per-request authorization.
///
/// Holds no mutable state of its own; everything that changes lives behind the
/// repositories, so one instance is shared by every request.
pub struct SessionService {
    codec: TokenCodec,
    verifier: CredentialVerifier,
    auth_repository: Arc<dyn AuthRepository>,
    user_repository: Arc<dyn UserRepository>,
}

impl SessionService {
    pub fn new(
        codec: TokenCodec,
        verifier: CredentialVerifier,
        auth_repository: Arc<dyn AuthRepository>,
        user_repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            codec,
            verifier,
            auth_repository,
            user_repository,
        }
    }

    /// Checks credentials and issues an access/refresh token pair.
    ///
    /// Unknown usernames and wrong passwords both fail with `InvalidCredentials`.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, AuthError> {
        let Some(user) = self.user_repository.find_by_username(username).await? else {
            // Same bcrypt work as a real mismatch so timing does not reveal the username
            if let Err(e) = self.verifier.verify_placeholder(password).await {
                warn!(error = %e, "Placeholder password check failed");
            }
            warn!("Login rejected: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verifier.verify(&user.password_hash, password).await? {
            warn!(user_id = user.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = user.id, "Login rejected: account inactive");
            return Err(AuthError::AccountInactive);
        }

        let access = self
            .codec
            .issue_access_token(user.id, &user.username, user.role)?;
        let refresh_token = self.codec.issue_refresh_token();

        self.auth_repository
            .save_refresh_token(NewRefreshToken::new(
                user.id,
                refresh_token.clone(),
                self.codec.refresh_ttl(),
            ))
            .await?;

        // Best effort: a failed timestamp update never fails the login
        if let Err(e) = self
            .user_repository
            .update_last_login(user.id, Utc::now())
            .await
        {
            warn!(user_id = user.id, error = %e, "Failed to record last login");
        }

        info!(user_id = user.id, jti = %access.jti, "User logged in");

        Ok(LoginResponse {
            token: TokenResponse {
                token_type: TOKEN_TYPE.to_string(),
                access_token: access.token,
                refresh_token,
                expires_in: self.codec.access_ttl_seconds(),
            },
            user: AuthUserSummary::from(&user),
        })
    }

    /// Issues a new access token for a stored refresh token.
    /// The refresh token itself is left unchanged.
    #[instrument(skip_all)]
    pub async fn renew(&self, refresh_token: &str) -> Result<RefreshTokenResponse, AuthError> {
        let Some(stored) = self
            .auth_repository
            .find_refresh_token(refresh_token)
            .await?
        else {
            warn!("Renew rejected: unknown refresh token");
            return Err(AuthError::InvalidToken);
        };

        if stored.is_expired() {
            warn!(user_id = stored.user_id, "Renew rejected: refresh token expired");
            return Err(AuthError::TokenExpired);
        }

        let Some(user) = self.user_repository.find_by_id(stored.user_id).await? else {
            warn!(user_id = stored.user_id, "Renew rejected: owner no longer exists");
            return Err(AuthError::UserNotFound);
        };

        if !user.is_active {
            warn!(user_id = user.id, "Renew rejected: account inactive");
            return Err(AuthError::AccountInactive);
        }

        let access = self
            .codec
            .issue_access_token(user.id, &user.username, user.role)?;

        info!(user_id = user.id, jti = %access.jti, "Access token renewed");

        Ok(RefreshTokenResponse {
            token_type: TOKEN_TYPE.to_string(),
            access_token: access.token,
            expires_in: self.codec.access_ttl_seconds(),
        })
    }

    /// Ends a session: deletes the refresh token and blacklists the access token's jti.
    ///
    /// An unknown refresh token is treated as already logged out. A refresh token
    /// owned by another user is rejected and left in place.
    #[instrument(skip(self, refresh_token, access_expires_at))]
    pub async fn revoke(
        &self,
        refresh_token: &str,
        jti: &str,
        access_expires_at: DateTime<Utc>,
        requesting_user_id: i64,
    ) -> Result<(), AuthError> {
        let Some(stored) = self
            .auth_repository
            .find_refresh_token(refresh_token)
            .await?
        else {
            info!(user_id = requesting_user_id, "Logout with unknown refresh token, nothing to do");
            return Ok(());
        };

        if stored.user_id != requesting_user_id {
            warn!(
                user_id = requesting_user_id,
                owner_id = stored.user_id,
                "Logout rejected: refresh token belongs to another user"
            );
            return Err(AuthError::Unauthorized);
        }

        // A concurrent logout may already have removed the row; the jti is blacklisted regardless
        if !self
            .auth_repository
            .delete_refresh_token(refresh_token)
            .await?
        {
            info!(user_id = requesting_user_id, "Refresh token already removed");
        }

        self.auth_repository
            .blacklist(jti, access_expires_at)
            .await?;

        info!(user_id = requesting_user_id, jti = %jti, "User logged out");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: i64) -> Result<ProfileResponse, AuthError> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            warn!(user_id, "Profile rejected: account inactive");
            return Err(AuthError::AccountInactive);
        }

        Ok(ProfileResponse::from(&user))
    }

    /// Validates a bearer token: signature and expiry first, then the blacklist
    #[instrument(skip_all)]
    pub async fn authorize(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let claims = self.codec.validate_access_token(token)?;

        if self.auth_repository.is_blacklisted(&claims.jti).await? {
            warn!(user_id = claims.user_id, jti = %claims.jti, "Blacklisted token presented");
            return Err(AuthError::TokenRevoked);
        }

        Ok(claims)
    }
}
