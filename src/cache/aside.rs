/// Cache-aside helper for user reads
///
/// Reads check the cache, fall back to the loader on a miss and populate the
/// cache before returning. Any cache failure degrades to a plain store read.
/// Writes invalidate; they never update cached values in place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{keys, CacheStore};
use crate::configuration::CacheSettings;
use crate::error::{AppError, CacheError};

#[derive(Clone)]
pub struct UserCache {
    store: Arc<dyn CacheStore>,
    list_ttl: Duration,
    single_ttl: Duration,
}

impl UserCache {
    pub fn new(store: Arc<dyn CacheStore>, settings: &CacheSettings) -> Self {
        Self {
            store,
            list_ttl: Duration::from_secs(settings.user_list_ttl),
            single_ttl: Duration::from_secs(settings.single_user_ttl),
        }
    }

    /// TTL for paginated lists and counts
    pub fn list_ttl(&self) -> Duration {
        self.list_ttl
    }

    /// TTL for single-user entries
    pub fn single_ttl(&self) -> Duration {
        self.single_ttl
    }

    pub async fn read_through<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => tracing::debug!(key = %key, "cache miss"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache read failed, using store"),
        }

        let value = load().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.store.set_with_ttl(key, &raw, ttl).await {
                    tracing::warn!(key = %key, error = %e, "Cache population failed");
                }
            }
            Err(e) => {
                let e = CacheError::from(e);
                tracing::warn!(key = %key, error = %e, "Cache population failed");
            }
        }

        Ok(value)
    }

    /// Drop the single-user entry. Awaited so the next read of this user
    /// cannot be served stale; failures are only logged.
    pub async fn invalidate_single(&self, user_id: Uuid) {
        let key = keys::single_user(user_id);
        if let Err(e) = self.store.delete(std::slice::from_ref(&key)).await {
            tracing::warn!(user_id = %user_id, error = %e, "Cache invalidation failed");
        }
    }

    /// Sweep every list and count entry in the background.
    pub fn invalidate_listings(&self) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            for prefix in [keys::USER_LIST_PREFIX, keys::USER_COUNT_PREFIX] {
                if let Err(e) = store.invalidate_prefix(prefix).await {
                    tracing::warn!(prefix = %prefix, error = %e, "Cache invalidation failed");
                }
            }
        });
    }

    /// Invalidation for writes that change user-visible fields
    pub async fn invalidate_user(&self, user_id: Uuid) {
        self.invalidate_single(user_id).await;
        self.invalidate_listings();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::UnavailableCache;
    use super::*;
    use crate::cache::InMemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn user_cache(store: Arc<dyn CacheStore>) -> UserCache {
        UserCache::new(store, &CacheSettings::default())
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let cache = user_cache(Arc::new(InMemoryCache::new()));
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: u64 = cache
                .read_through("users:count:x", cache.list_ttl(), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loader_errors_are_not_cached() {
        let backend = Arc::new(InMemoryCache::new());
        let cache = user_cache(backend.clone());

        let result: Result<u64, AppError> = cache
            .read_through("user:missing", cache.single_ttl(), || async {
                Err(AppError::NotFound("User not found".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_outage_falls_back_to_loader() {
        let cache = user_cache(Arc::new(UnavailableCache));
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: String = cache
                .read_through("user:1", cache.single_ttl(), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok("fresh".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "fresh");
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        cache.invalidate_user(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_replaced() {
        let backend = Arc::new(InMemoryCache::new());
        backend
            .set_with_ttl("users:count:y", "not json", Duration::from_secs(60))
            .await
            .unwrap();
        let cache = user_cache(backend.clone());

        let value: u64 = cache
            .read_through("users:count:y", cache.list_ttl(), || async { Ok(7) })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(
            backend.get("users:count:y").await.unwrap().as_deref(),
            Some("7")
        );
    }

    #[tokio::test]
    async fn test_invalidate_single_leaves_other_users() {
        let backend = Arc::new(InMemoryCache::new());
        let cache = user_cache(backend.clone());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let ttl = Duration::from_secs(60);
        backend.set_with_ttl(&keys::single_user(a), "1", ttl).await.unwrap();
        backend.set_with_ttl(&keys::single_user(b), "2", ttl).await.unwrap();

        cache.invalidate_single(a).await;

        assert!(backend.get(&keys::single_user(a)).await.unwrap().is_none());
        assert!(backend.get(&keys::single_user(b)).await.unwrap().is_some());
    }
}
