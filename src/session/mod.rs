// Public API - what other modules can use
pub use handlers::{login, logout, me, refresh_token};
pub use middleware::jwt_auth;
pub use service::SessionService;
pub use token::{AccessTokenClaims, TokenCodec};

pub mod cleanup_task;
pub mod errors;
mod handlers;
mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;
pub mod types;
