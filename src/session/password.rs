use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

/// Shortest password accepted when hashing a new credential
pub const MIN_PASSWORD_LENGTH: usize = 8;

const PLACEHOLDER_PASSWORD: &str = "placeholder-password-never-stored";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password must be at least 8 characters")]
    TooShort,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Password worker failed: {0}")]
    Worker(String),
}

/// Checks plain-text passwords against stored bcrypt hashes.
///
/// Hashing and verification run on the blocking pool, off the request worker.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    cost: u32,
    // Hash checked when no stored credential exists, built on first use
    placeholder_hash: Arc<OnceCell<String>>,
}

impl CredentialVerifier {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            placeholder_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hashes a new password for storage
    #[instrument(skip(self, plain_password))]
    pub async fn hash(&self, plain_password: &str) -> Result<String, PasswordError> {
        if plain_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(PasswordError::TooShort);
        }

        let cost = self.cost;
        let password = plain_password.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| PasswordError::Worker(e.to_string()))?
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Returns `Ok(true)` only when the password matches the stored hash.
    /// A hash bcrypt cannot parse is treated as a mismatch.
    #[instrument(skip_all)]
    pub async fn verify(
        &self,
        stored_hash: &str,
        plain_password: &str,
    ) -> Result<bool, PasswordError> {
        let hash = stored_hash.to_owned();
        let password = plain_password.to_owned();

        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| PasswordError::Worker(e.to_string()))?;

        match outcome {
            Ok(matches) => {
                debug!(matches, "Password verification finished");
                Ok(matches)
            }
            Err(e) => {
                warn!(error = %e, "Stored password hash could not be parsed");
                Ok(false)
            }
        }
    }

    /// Runs a full bcrypt verification at the configured cost against a hash
    /// no account owns. The result is discarded.
    #[instrument(skip_all)]
    pub async fn verify_placeholder(&self, plain_password: &str) -> Result<(), PasswordError> {
        let cost = self.cost;
        let hash = self
            .placeholder_hash
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || bcrypt::hash(PLACEHOLDER_PASSWORD, cost))
                    .await
                    .map_err(|e| PasswordError::Worker(e.to_string()))?
                    .map_err(|e| PasswordError::Hashing(e.to_string()))
            })
            .await?;

        self.verify(hash, plain_password).await?;
        Ok(())
    }
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
