//! Typed entity cache over a [`CacheBackend`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::debug;

use crate::domain::entity::Entity;
use crate::domain::types::EntityKind;

use super::backend::CacheBackend;
use super::codec;
use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::CacheKey;

const METRIC_CACHE_HIT: &str = "social_cache_hit_total";
const METRIC_CACHE_MISS: &str = "social_cache_miss_total";
const METRIC_CACHE_ERROR: &str = "social_cache_error_total";

/// Fast-path cache holding recently read entities.
///
/// A missing or expired key reads back as `Ok(None)`. Transport failures,
/// timeouts and undecodable entries are errors, never misses.
#[derive(Clone)]
pub struct EntityCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    operation_timeout: Duration,
    key_prefix: String,
}

impl EntityCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            ttl: config.ttl,
            operation_timeout: config.operation_timeout,
            key_prefix: config.key_prefix.clone(),
        }
    }

    pub async fn get<E: Entity>(&self, id: i64) -> Result<Option<E>, CacheError> {
        let key = CacheKey::of::<E>(id).render(&self.key_prefix);
        let raw = self.bounded(E::KIND, self.backend.get(&key)).await?;

        let Some(raw) = raw else {
            counter!(METRIC_CACHE_MISS, "kind" => E::KIND.as_str()).increment(1);
            debug!(key = %key, "cache miss");
            return Ok(None);
        };

        let entity = codec::decode::<E>(&key, &raw).inspect_err(|_| {
            counter!(METRIC_CACHE_ERROR, "kind" => E::KIND.as_str()).increment(1);
        })?;
        counter!(METRIC_CACHE_HIT, "kind" => E::KIND.as_str()).increment(1);
        debug!(key = %key, "cache hit");
        Ok(Some(entity))
    }

    /// Store `entity` under the configured time-to-live.
    pub async fn set<E: Entity>(&self, entity: &E) -> Result<(), CacheError> {
        let key = CacheKey::of::<E>(entity.id()).render(&self.key_prefix);
        let value = codec::encode(&key, entity)?;
        self.bounded(E::KIND, self.backend.set_ex(&key, value, self.ttl))
            .await
    }

    pub async fn delete<E: Entity>(&self, id: i64) -> Result<(), CacheError> {
        let key = CacheKey::of::<E>(id).render(&self.key_prefix);
        self.bounded(E::KIND, self.backend.delete(&key)).await
    }

    /// Run one backend call under the operation timeout. Dropping the future
    /// on expiry abandons the request instead of leaving it running.
    async fn bounded<T>(
        &self,
        kind: EntityKind,
        op: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        let result = match tokio::time::timeout(self.operation_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        };
        if result.is_err() {
            counter!(METRIC_CACHE_ERROR, "kind" => kind.as_str()).increment(1);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use time::macros::datetime;

    use super::*;
    use crate::cache::MemoryBackend;
    use crate::domain::entities::{Role, User};

    fn user(id: i64) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            created_at: datetime!(2024-03-01 12:00 UTC),
            is_active: true,
            role_id: 1,
            role: Role {
                id: 1,
                name: "user".to_string(),
                description: "A user can create posts and comments".to_string(),
                level: 1,
            },
        }
    }

    fn memory_cache(config: &CacheConfig) -> EntityCache {
        EntityCache::new(
            Arc::new(MemoryBackend::new(config.memory_capacity_non_zero())),
            config,
        )
    }

    struct StallingBackend;

    #[async_trait]
    impl CacheBackend for StallingBackend {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
            std::future::pending().await
        }

        async fn set_ex(
            &self,
            _key: &str,
            _value: Bytes,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn set_then_get_returns_equal_entity() {
        let cache = memory_cache(&CacheConfig::default());
        let stored = user(7);

        cache.set(&stored).await.expect("set");
        let cached: Option<User> = cache.get(7).await.expect("get");

        assert_eq!(cached, Some(stored));
    }

    #[tokio::test]
    async fn absent_key_is_not_an_error() {
        let cache = memory_cache(&CacheConfig::default());
        let cached: Option<User> = cache.get(1).await.expect("get");
        assert!(cached.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_with_configured_ttl() {
        let config = CacheConfig {
            ttl: Duration::from_secs(10),
            ..Default::default()
        };
        let cache = memory_cache(&config);
        cache.set(&user(3)).await.expect("set");

        tokio::time::advance(Duration::from_secs(11)).await;
        let cached: Option<User> = cache.get(3).await.expect("get");
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_surfaces_decode_error() {
        let config = CacheConfig {
            key_prefix: "t:".to_string(),
            ..Default::default()
        };
        let backend = Arc::new(MemoryBackend::new(config.memory_capacity_non_zero()));
        backend
            .set_ex(
                "t:user:5",
                Bytes::from_static(b"not json"),
                Duration::from_secs(60),
            )
            .await
            .expect("seed");
        let cache = EntityCache::new(backend, &config);

        let err = cache.get::<User>(5).await.expect_err("corrupt entry");
        assert!(matches!(err, CacheError::Decode { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_times_out() {
        let config = CacheConfig {
            operation_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let cache = EntityCache::new(Arc::new(StallingBackend), &config);

        assert!(matches!(
            cache.get::<User>(1).await,
            Err(CacheError::Timeout)
        ));
        assert!(matches!(cache.set(&user(1)).await, Err(CacheError::Timeout)));
    }
}
