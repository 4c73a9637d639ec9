use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::CacheError;

/// Key/value store with per-key expiry backing the entity cache.
///
/// Expiry is the backend's job: an expired key must read back as `Ok(None)`,
/// exactly like a key that was never written.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Overwrite `key` unconditionally; it expires `ttl` after this call.
    async fn set_ex(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
