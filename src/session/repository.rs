use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{BlacklistEntry, NewRefreshToken, RefreshTokenModel};
use crate::shared::StoreError;

/// Persistence for refresh tokens and blacklisted access-token ids.
///
/// Each call is atomic on its own; callers get no cross-call transactions.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn save_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenModel, StoreError>;
    async fn find_refresh_token(&self, token: &str)
        -> Result<Option<RefreshTokenModel>, StoreError>;
    /// Returns whether a row was removed
    async fn delete_refresh_token(&self, token: &str) -> Result<bool, StoreError>;
    /// Idempotent: blacklisting a jti twice keeps the first entry
    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError>;
    /// True until the second after the entry's expiry, matching access-token `exp` granularity
    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError>;
    /// Removes expired refresh tokens and blacklist entries, returning how many of each
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<(u64, u64), StoreError>;
}

#[derive(Default)]
struct AuthTables {
    next_refresh_id: i64,
    next_blacklist_id: i64,
    refresh_tokens: HashMap<String, RefreshTokenModel>,
    blacklist: HashMap<String, BlacklistEntry>,
}

/// In-memory implementation of AuthRepository for development and testing
///
/// Data is lost when the process exits, so every session ends on restart.
pub struct InMemoryAuthRepository {
    tables: RwLock<AuthTables>,
}

impl Default for InMemoryAuthRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(AuthTables {
                next_refresh_id: 1,
                next_blacklist_id: 1,
                ..AuthTables::default()
            }),
        }
    }

    pub async fn refresh_token_count(&self) -> usize {
        self.tables.read().await.refresh_tokens.len()
    }

    pub async fn blacklist_count(&self) -> usize {
        self.tables.read().await.blacklist.len()
    }
}

#[async_trait]
impl AuthRepository for InMemoryAuthRepository {
    #[instrument(skip_all, fields(user_id = token.user_id))]
    async fn save_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenModel, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.refresh_tokens.contains_key(&token.token) {
            warn!("Refresh token collision in memory");
            return Err(StoreError::Duplicate("refresh token already exists".to_string()));
        }

        let model = RefreshTokenModel {
            id: tables.next_refresh_id,
            user_id: token.user_id,
            token: token.token,
            expires_at: token.expires_at,
            created_at: Utc::now(),
        };
        tables.next_refresh_id += 1;
        tables
            .refresh_tokens
            .insert(model.token.clone(), model.clone());

        debug!(refresh_token_id = model.id, "Refresh token stored in memory");
        Ok(model)
    }

    #[instrument(skip_all)]
    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenModel>, StoreError> {
        let found = self.tables.read().await.refresh_tokens.get(token).cloned();
        debug!(found = found.is_some(), "Refresh token lookup in memory");
        Ok(found)
    }

    #[instrument(skip_all)]
    async fn delete_refresh_token(&self, token: &str) -> Result<bool, StoreError> {
        let removed = self
            .tables
            .write()
            .await
            .refresh_tokens
            .remove(token)
            .is_some();
        debug!(removed, "Refresh token delete in memory");
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.blacklist.contains_key(jti) {
            debug!(jti = %jti, "Jti already blacklisted in memory");
            return Ok(());
        }

        let entry = BlacklistEntry {
            id: tables.next_blacklist_id,
            jti: jti.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        tables.next_blacklist_id += 1;
        tables.blacklist.insert(entry.jti.clone(), entry);

        debug!(jti = %jti, "Jti blacklisted in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        let tables = self.tables.read().await;
        Ok(tables
            .blacklist
            .get(jti)
            .is_some_and(|entry| entry.is_active_at(now)))
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<(u64, u64), StoreError> {
        let mut tables = self.tables.write().await;

        let refresh_before = tables.refresh_tokens.len();
        tables
            .refresh_tokens
            .retain(|_, token| !token.is_expired_at(now));
        let refresh_removed = (refresh_before - tables.refresh_tokens.len()) as u64;

        let blacklist_before = tables.blacklist.len();
        tables.blacklist.retain(|_, entry| entry.is_active_at(now));
        let blacklist_removed = (blacklist_before - tables.blacklist.len()) as u64;

        debug!(refresh_removed, blacklist_removed, "Expired auth rows purged from memory");
        Ok((refresh_removed, blacklist_removed))
    }
}

/// PostgreSQL implementation of auth repository
pub struct PostgresAuthRepository {
    pool: PgPool,
}

impl PostgresAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthRepository for PostgresAuthRepository {
    #[instrument(skip_all, fields(user_id = token.user_id))]
    async fn save_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenModel, StoreError> {
        let row = sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token, expires_at, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING id, created_at",
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store refresh token");
            StoreError::from(e)
        })?;

        let model = RefreshTokenModel {
            id: row.try_get("id")?,
            user_id: token.user_id,
            token: token.token,
            expires_at: token.expires_at,
            created_at: row.try_get("created_at")?,
        };
        debug!(refresh_token_id = model.id, "Refresh token stored in database");
        Ok(model)
    }

    #[instrument(skip_all)]
    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenModel>, StoreError> {
        sqlx::query_as::<_, RefreshTokenModel>(
            "SELECT id, user_id, token, expires_at, created_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch refresh token");
            StoreError::from(e)
        })
    }

    #[instrument(skip_all)]
    async fn delete_refresh_token(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete refresh token");
                StoreError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, jti = %jti, "Failed to blacklist jti");
            StoreError::from(e)
        })?;

        debug!(jti = %jti, "Jti blacklisted in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE jti = $1 AND expires_at >= $2) AS listed",
        )
        .bind(jti)
        .bind(Utc::now().trunc_subsecs(0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, jti = %jti, "Failed to check blacklist");
            StoreError::from(e)
        })?;

        Ok(row.try_get("listed")?)
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<(u64, u64), StoreError> {
        let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        let blacklist = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < $1")
            .bind(now.trunc_subsecs(0))
            .execute(&self.pool)
            .await?;

        Ok((refresh.rows_affected(), blacklist.rows_affected()))
    }
}
