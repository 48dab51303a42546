use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument};

use super::repository::AuthRepository;
use crate::shared::StoreError;

/// Configuration for the expired-token sweep
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// How often to purge expired refresh tokens and blacklist entries
    pub cleanup_interval: Duration,
}

impl CleanupConfig {
    pub fn every_minutes(minutes: u64) -> Self {
        Self {
            cleanup_interval: Duration::from_secs(minutes.saturating_mul(60).max(1)),
        }
    }
}

/// Periodically removes rows whose expiry has passed.
/// Expired rows are already ignored by every lookup, so this only reclaims space.
#[instrument(skip(auth_repository))]
pub async fn start_cleanup_task(auth_repository: Arc<dyn AuthRepository>, config: CleanupConfig) {
    info!(
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        "Starting expired token cleanup task"
    );

    let mut cleanup_interval = interval(config.cleanup_interval);

    loop {
        cleanup_interval.tick().await;

        match purge_expired_tokens(&auth_repository).await {
            Ok((refresh_removed, blacklist_removed)) => {
                info!(refresh_removed, blacklist_removed, "Token cleanup completed");
            }
            Err(e) => {
                error!(error = %e, "Token cleanup task failed");
            }
        }
    }
}

async fn purge_expired_tokens(
    auth_repository: &Arc<dyn AuthRepository>,
) -> Result<(u64, u64), StoreError> {
    auth_repository.purge_expired(Utc::now()).await
}
