use tracing::{info, instrument, warn};

use super::{
    models::{NewUser, Role, UserModel},
    repository::UserRepository,
};
use crate::config::BootstrapOwner;
use crate::session::{errors::AuthError, password::CredentialVerifier};
use crate::shared::StoreError;

/// Creates the first owner account so a fresh install has someone who can log in.
///
/// Returns `Ok(None)` when the account already exists.
#[instrument(skip_all, fields(username = %owner.username))]
pub async fn ensure_owner(
    user_repository: &dyn UserRepository,
    verifier: &CredentialVerifier,
    owner: &BootstrapOwner,
) -> Result<Option<UserModel>, AuthError> {
    if user_repository
        .find_by_username(&owner.username)
        .await?
        .is_some()
    {
        info!("Owner account already present, skipping bootstrap");
        return Ok(None);
    }

    let password_hash = verifier.hash(&owner.password).await?;
    let new_owner = NewUser {
        full_name: owner.full_name.clone(),
        username: owner.username.clone(),
        email: format!("{}@localhost", owner.username),
        password_hash,
        role: Role::Owner,
        phone_number: format!("owner-{}", owner.username),
    };

    match user_repository.insert_user(new_owner).await {
        Ok(user) => {
            info!(user_id = user.id, "Owner account created");
            Ok(Some(user))
        }
        Err(StoreError::Duplicate(detail)) => {
            warn!(detail = %detail, "Owner account created concurrently, skipping bootstrap");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::repository::InMemoryUserRepository;

    fn owner() -> BootstrapOwner {
        BootstrapOwner {
            username: "boss".to_string(),
            password: "owner-password".to_string(),
            full_name: "Laundry Boss".to_string(),
        }
    }

    #[tokio::test]
    async fn test_creates_owner_once() {
        let repo = InMemoryUserRepository::new();
        let verifier = CredentialVerifier::new(4);

        let created = ensure_owner(&repo, &verifier, &owner()).await.unwrap();
        let created = created.unwrap();
        assert_eq!(created.role, Role::Owner);
        assert!(verifier
            .verify(&created.password_hash, "owner-password")
            .await
            .unwrap());

        let second = ensure_owner(&repo, &verifier, &owner()).await.unwrap();
        assert!(second.is_none());
        assert_eq!(repo.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_short_owner_password_rejected() {
        let repo = InMemoryUserRepository::new();
        let mut weak = owner();
        weak.password = "short".to_string();

        let result = ensure_owner(&repo, &CredentialVerifier::new(4), &weak).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
        assert_eq!(repo.user_count().await, 0);
    }
}
