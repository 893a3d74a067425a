/// Refresh Token Registry
///
/// Tracks which refresh tokens are currently honored for each user.
/// Refresh tokens are:
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Single-use: rotation removes the presented token
/// - Held in the user's record, so a token survives only as long as its owner

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::UserStore;

/// Hash a refresh token using SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct RefreshTokenRegistry {
    store: Arc<dyn UserStore>,
}

impl RefreshTokenRegistry {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Record `token` as valid for `user_id` and stamp the login time,
    /// which is returned. Adding a token already present is a no-op on the set.
    ///
    /// # Errors
    /// `NotFound` if the user no longer exists
    pub async fn add(&self, user_id: Uuid, token: &str) -> Result<DateTime<Utc>, AppError> {
        let now = Utc::now();
        let found = self
            .store
            .push_refresh_token(user_id, &hash_token(token), now)
            .await?;

        if !found {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(now)
    }

    /// Remove one token. Returns `true` only if this call removed it, so of
    /// two concurrent removals of the same token exactly one sees `true`.
    pub async fn remove(&self, user_id: Uuid, token: &str) -> Result<bool, AppError> {
        Ok(self
            .store
            .pull_refresh_token(user_id, &hash_token(token))
            .await?)
    }

    /// Empty the user's set. Missing users are ignored.
    pub async fn remove_all(&self, user_id: Uuid) -> Result<(), AppError> {
        if !self.store.clear_refresh_tokens(user_id).await? {
            tracing::debug!(user_id = %user_id, "No user to clear refresh tokens for");
        }
        Ok(())
    }

    /// The user exists, is active, and holds `token`
    pub async fn is_valid(&self, user_id: Uuid, token: &str) -> Result<bool, AppError> {
        let digest = hash_token(token);
        Ok(self
            .store
            .find_by_id(user_id)
            .await?
            .map(|user| user.is_active && user.holds_refresh_token(&digest))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{sample_user, NewUser, User};
    use crate::store::{InMemoryUserStore, UserStore};

    async fn registry_with_user() -> (RefreshTokenRegistry, User) {
        let store = Arc::new(InMemoryUserStore::new());
        let template = sample_user("E200");
        let user = store
            .create(NewUser {
                first_name: template.first_name,
                middle_name: template.middle_name,
                last_name: template.last_name,
                email: template.email,
                employee_id: template.employee_id,
                phone_number: template.phone_number,
                password_hash: template.password_hash,
                role: template.role,
            })
            .await
            .unwrap();
        (RefreshTokenRegistry::new(store), user)
    }

    #[test]
    fn test_token_hashing() {
        let hash1 = hash_token("some.refresh.token");
        let hash2 = hash_token("some.refresh.token");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, "some.refresh.token");
        // SHA-256 hex
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, hash_token("other.refresh.token"));
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let (registry, user) = registry_with_user().await;

        registry.add(user.id, "t1").await.unwrap();
        registry.add(user.id, "t2").await.unwrap();
        assert!(registry.is_valid(user.id, "t1").await.unwrap());

        assert!(registry.remove(user.id, "t1").await.unwrap());
        assert!(!registry.remove(user.id, "t1").await.unwrap());
        assert!(!registry.is_valid(user.id, "t1").await.unwrap());
        assert!(registry.is_valid(user.id, "t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_all() {
        let (registry, user) = registry_with_user().await;
        registry.add(user.id, "t1").await.unwrap();
        registry.add(user.id, "t2").await.unwrap();

        registry.remove_all(user.id).await.unwrap();

        assert!(!registry.is_valid(user.id, "t1").await.unwrap());
        assert!(!registry.is_valid(user.id, "t2").await.unwrap());
        registry.remove_all(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (registry, _) = registry_with_user().await;
        let stranger = Uuid::new_v4();

        assert!(matches!(
            registry.add(stranger, "t1").await,
            Err(AppError::NotFound(_))
        ));
        assert!(!registry.is_valid(stranger, "t1").await.unwrap());
        assert!(!registry.remove(stranger, "t1").await.unwrap());
    }
}
