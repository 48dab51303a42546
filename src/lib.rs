// Library crate for the laundry shop auth backend
// This file exposes the public API for integration tests

pub mod config;
pub mod routes;
pub mod session;
pub mod shared;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use config::{Config, JwtConfig};
pub use routes::create_router;
pub use session::{AccessTokenClaims, SessionService, TokenCodec};
pub use shared::{AppError, AppState};
