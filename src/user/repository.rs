use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{NewUser, Role, UserModel};
use crate::shared::StoreError;

/// Trait for user lookups needed by the session lifecycle
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserModel>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, StoreError>;
    /// Inserts a new user; username, email and phone number must be unique
    async fn insert_user(&self, user: NewUser) -> Result<UserModel, StoreError>;
    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError>;
}

struct UserTable {
    next_id: i64,
    users: HashMap<i64, UserModel>,
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(UserTable {
                next_id: 1,
                users: HashMap::new(),
            }),
        }
    }

    /// Creates a repository with pre-populated users, keeping their ids
    pub fn with_users(users: Vec<UserModel>) -> Self {
        let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let users = users.into_iter().map(|u| (u.id, u)).collect();

        Self {
            table: RwLock::new(UserTable { next_id, users }),
        }
    }

    pub async fn user_count(&self) -> usize {
        self.table.read().await.users.len()
    }

    /// Flips the active flag; stands in for the user-management module in tests
    pub async fn set_active(&self, id: i64, is_active: bool) -> bool {
        match self.table.write().await.users.get_mut(&id) {
            Some(user) => {
                user.is_active = is_active;
                true
            }
            None => false,
        }
    }

    pub async fn remove_user(&self, id: i64) -> bool {
        self.table.write().await.users.remove(&id).is_some()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<UserModel>, StoreError> {
        debug!(user_id = id, "Fetching user from memory");
        Ok(self.table.read().await.users.get(&id).cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, StoreError> {
        debug!(username = %username, "Fetching user by username from memory");
        let table = self.table.read().await;
        Ok(table
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert_user(&self, user: NewUser) -> Result<UserModel, StoreError> {
        let mut table = self.table.write().await;

        let clash = table.users.values().find_map(|existing| {
            if existing.username == user.username {
                Some("username")
            } else if existing.email == user.email {
                Some("email")
            } else if existing.phone_number == user.phone_number {
                Some("phone_number")
            } else {
                None
            }
        });
        if let Some(field) = clash {
            warn!(field, "User insert rejected by uniqueness check");
            return Err(StoreError::Duplicate(format!("{} already taken", field)));
        }

        let id = table.next_id;
        table.next_id += 1;
        let model = user.into_model(id);
        table.users.insert(id, model.clone());

        debug!(user_id = id, "User inserted in memory");
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        match self.table.write().await.users.get_mut(&id) {
            Some(user) => {
                user.last_login_at = Some(at);
                Ok(())
            }
            None => {
                warn!(user_id = id, "User not found for last-login update");
                Err(StoreError::Backend(format!("user {} not found", id)))
            }
        }
    }
}

const USER_COLUMNS: &str = "id, full_name, username, email, password_hash, role, phone_number, \
                            is_active, last_login_at, created_at, updated_at";

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &sqlx::postgres::PgRow) -> Result<UserModel, StoreError> {
        let role_text: String = row.try_get("role")?;
        let role = Role::from_str(&role_text)
            .map_err(|_| StoreError::Backend(format!("unknown role '{}' in users table", role_text)))?;

        Ok(UserModel {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role,
            phone_number: row.try_get("phone_number")?,
            is_active: row.try_get("is_active")?,
            last_login_at: row.try_get("last_login_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<UserModel>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = id, "Failed to fetch user from database");
                StoreError::from(e)
            })?;

        row.as_ref().map(Self::map_row).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch user by username from database");
            StoreError::from(e)
        })?;

        row.as_ref().map(Self::map_row).transpose()
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert_user(&self, user: NewUser) -> Result<UserModel, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (full_name, username, email, password_hash, role, phone_number, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(&user.phone_number)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert user");
            StoreError::from(e)
        })?;

        Self::map_row(&row)
    }

    #[instrument(skip(self))]
    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = id, "Failed to update last login");
                StoreError::from(e)
            })?;

        Ok(())
    }
}
