use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::user::models::Role;

/// Issuer stamped into and required on every access token
pub const TOKEN_ISSUER: &str = "vip-laundry-backend";

const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Identity claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AccessTokenClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// A freshly signed access token with the identifiers the caller needs to keep
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and validates HS256 access tokens and mints opaque refresh tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        Self::with_ttls(
            config.secret(),
            Duration::minutes(config.access_ttl_minutes),
            Duration::hours(config.refresh_ttl_hours),
        )
    }

    pub fn with_ttls(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Lifetime of an access token in seconds, reported to clients as `expires_in`
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Signs a new access token with a fresh jti
    #[instrument(skip(self, username))]
    pub fn issue_access_token(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
    ) -> Result<IssuedAccessToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;
        let jti = Uuid::new_v4().to_string();

        let claims = AccessTokenClaims {
            user_id,
            username: username.to_string(),
            role,
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                debug!(error = %e, "Failed to encode access token");
                TokenError::Encoding(e.to_string())
            })?;

        debug!(jti = %jti, exp = claims.exp, "Access token issued");
        Ok(IssuedAccessToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Verifies signature, algorithm, issuer and expiry, in that order of precedence
    #[instrument(skip_all)]
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Access token rejected");
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        TokenError::BadSignature
                    }
                    _ => TokenError::Malformed(e.to_string()),
                }
            })
    }

    /// Opaque refresh token: 32 bytes from the thread-local CSPRNG, hex encoded
    pub fn issue_refresh_token(&self) -> String {
        let bytes: [u8; REFRESH_TOKEN_BYTES] = rand::random();
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
