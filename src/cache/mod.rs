/// Cache store
///
/// The cache is never authoritative. Backends implement `CacheStore`; bulk
/// invalidation is expressed as `invalidate_prefix` so backends without native
/// pattern scanning can sweep instead.

mod aside;
pub mod keys;
mod memory;
mod redis_cache;

pub use aside::UserCache;
#[cfg(test)]
pub(crate) use aside::testing;
pub use memory::InMemoryCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Returns the number of keys removed
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// Remove every key starting with `prefix`. Returns the number removed.
    async fn invalidate_prefix(&self, prefix: &str) -> CacheResult<u64>;
}
