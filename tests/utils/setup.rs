use axum::Router;
use chrono::Duration;
use std::sync::Arc;

use laundry_backend::{
    create_router,
    session::{
        password::CredentialVerifier, repository::InMemoryAuthRepository, SessionService,
        TokenCodec,
    },
    shared::AppState,
    user::{
        models::{NewUser, Role},
        InMemoryUserRepository,
    },
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const TEST_PASSWORD: &str = "laundry-secret";
pub const TEST_SECRET: &str = "integration-test-secret";

pub struct SeedUser {
    pub username: String,
    pub role: Role,
    pub active: bool,
}

pub struct TestSetup {
    pub app: Router,
    pub auth_repo: Arc<InMemoryAuthRepository>,
    pub user_repo: Arc<InMemoryUserRepository>,
}

pub struct TestSetupBuilder {
    users: Vec<SeedUser>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::hours(24),
        }
    }

    pub fn with_user(mut self, username: &str, role: Role) -> Self {
        self.users.push(SeedUser {
            username: username.to_string(),
            role,
            active: true,
        });
        self
    }

    pub fn with_inactive_user(mut self, username: &str, role: Role) -> Self {
        self.users.push(SeedUser {
            username: username.to_string(),
            role,
            active: false,
        });
        self
    }

    /// Cashier "sari" and courier "joko"
    pub fn with_two_employees(self) -> Self {
        self.with_user("sari", Role::Cashier)
            .with_user("joko", Role::Courier)
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub async fn build(self) -> TestSetup {
        let auth_repo = Arc::new(InMemoryAuthRepository::new());
        // Lowest bcrypt cost keeps the suite fast
        let verifier = CredentialVerifier::new(4);

        let mut users = Vec::with_capacity(self.users.len());
        for (index, seed) in self.users.iter().enumerate() {
            let mut user = NewUser {
                full_name: format!("{} Employee", seed.username),
                username: seed.username.clone(),
                email: format!("{}@laundry.test", seed.username),
                password_hash: verifier.hash(TEST_PASSWORD).await.unwrap(),
                role: seed.role,
                phone_number: format!("0812000{}", index),
            }
            .into_model(index as i64 + 1);
            user.is_active = seed.active;
            users.push(user);
        }
        let user_repo = Arc::new(InMemoryUserRepository::with_users(users));

        let service = SessionService::new(
            TokenCodec::with_ttls(TEST_SECRET, self.access_ttl, self.refresh_ttl),
            verifier,
            auth_repo.clone(),
            user_repo.clone(),
        );
        let app = create_router(AppState::new(Arc::new(service)), &["*".to_string()]);

        TestSetup {
            app,
            auth_repo,
            user_repo,
        }
    }
}
