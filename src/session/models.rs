use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for the refresh_tokens table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct RefreshTokenModel {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A refresh token about to be persisted; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl NewRefreshToken {
    pub fn new(user_id: i64, token: String, ttl: Duration) -> Self {
        Self {
            user_id,
            token,
            expires_at: Utc::now() + ttl,
        }
    }
}

impl RefreshTokenModel {
    /// A token whose expiry is now or in the past can no longer be renewed
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Database model for the token_blacklist table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct BlacklistEntry {
    pub id: i64,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BlacklistEntry {
    /// Entries stop mattering once the access token they shadow has expired.
    /// Compared in whole seconds: a token whose `exp` equals the current
    /// second still validates, so its entry must still count.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.timestamp() >= now.timestamp()
    }
}
