pub mod bootstrap;
pub mod models;
pub mod repository;

pub use models::{Role, UserModel};
pub use repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};
