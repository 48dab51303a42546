use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Employee roles known to the laundry shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Owner,
    Cashier,
    Staff,
    Courier,
}

/// Database model for the users table
#[derive(Debug, Clone)]
pub struct UserModel {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone_number: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields needed to register a new user; the repository assigns the id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone_number: String,
}

impl NewUser {
    /// Builds the stored row for this registration, active by default
    pub fn into_model(self, id: i64) -> UserModel {
        UserModel {
            id,
            full_name: self.full_name,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            phone_number: self.phone_number,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}
