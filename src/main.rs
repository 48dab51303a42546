use laundry_backend::{
    config::Config,
    create_router,
    session::{
        cleanup_task::{start_cleanup_task, CleanupConfig},
        password::CredentialVerifier,
        repository::{AuthRepository, InMemoryAuthRepository, PostgresAuthRepository},
        SessionService, TokenCodec,
    },
    shared::AppState,
    user::{bootstrap::ensure_owner, InMemoryUserRepository, PostgresUserRepository, UserRepository},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "laundry_backend={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(app_env = %config.app_env, "Starting laundry backend");
    if config.uses_development_secret() {
        warn!("JWT_SECRET not set, using insecure development secret");
    }

    let (auth_repository, user_repository): (Arc<dyn AuthRepository>, Arc<dyn UserRepository>) =
        match &config.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(database_url)
                    .await?;
                sqlx::migrate!("./migrations").run(&pool).await?;
                info!("Connected to PostgreSQL and applied migrations");

                let auth: Arc<dyn AuthRepository> =
                    Arc::new(PostgresAuthRepository::new(pool.clone()));
                let users: Arc<dyn UserRepository> = Arc::new(PostgresUserRepository::new(pool));
                (auth, users)
            }
            None => {
                warn!("DATABASE_URL not set, sessions and users live in memory only");
                let auth: Arc<dyn AuthRepository> = Arc::new(InMemoryAuthRepository::new());
                let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
                (auth, users)
            }
        };

    let verifier = CredentialVerifier::new(config.bcrypt_cost);
    info!(bcrypt_cost = verifier.cost(), "Credential verifier ready");

    if let Some(owner) = &config.bootstrap_owner {
        ensure_owner(user_repository.as_ref(), &verifier, owner).await?;
    }

    if let Some(minutes) = config.cleanup_interval_minutes {
        tokio::spawn(start_cleanup_task(
            auth_repository.clone(),
            CleanupConfig::every_minutes(minutes),
        ));
    }

    let session_service = SessionService::new(
        TokenCodec::new(&config.jwt),
        verifier,
        auth_repository,
        user_repository,
    );
    let app_state = AppState::new(Arc::new(session_service));
    let app = create_router(app_state, &config.cors_allowed_origins);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
