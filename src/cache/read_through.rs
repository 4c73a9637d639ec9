//! Cache-aside read path.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::application::error::AccessError;
use crate::application::repos::EntityStore;
use crate::domain::entity::Entity;

use super::store::EntityCache;

const METRIC_CACHE_STALE: &str = "social_cache_stale_total";

/// State of the cached copy after a write already committed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSync {
    /// Cache holds the new value, or caching is disabled.
    Current,
    /// Overwrite failed; the key was dropped so the next read reloads it.
    Evicted,
    /// Neither overwrite nor eviction reached the cache. A previously
    /// cached copy may be served until its TTL runs out.
    Stale,
}

/// Serves `get by id` for one entity kind, consulting the fast-path cache
/// before the authoritative store.
///
/// Concurrent misses on the same cold key each reach the store and each
/// populate the cache; the last write wins. There is no single-flight
/// de-duplication.
pub struct ReadThrough<E: Entity> {
    store: Arc<dyn EntityStore<E>>,
    cache: Option<Arc<EntityCache>>,
}

impl<E: Entity> Clone for ReadThrough<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
        }
    }
}

impl<E: Entity> ReadThrough<E> {
    /// `cache = None` disables caching: every read goes to the store.
    pub fn new(store: Arc<dyn EntityStore<E>>, cache: Option<Arc<EntityCache>>) -> Self {
        Self { store, cache }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    #[instrument(skip(self), fields(kind = E::KIND.as_str()))]
    pub async fn get(&self, id: i64) -> Result<E, AccessError> {
        let Some(cache) = self.cache.as_ref() else {
            return Ok(self.store.get_by_id(id).await?);
        };

        if let Some(entity) = cache.get::<E>(id).await? {
            return Ok(entity);
        }

        let entity = self.store.get_by_id(id).await?;
        cache.set(&entity).await?;
        debug!(id, "populated cache from store");
        Ok(entity)
    }

    /// Overwrite the cached copy after the caller changed the entity in the
    /// store. No-op when caching is disabled.
    pub async fn refresh(&self, entity: &E) -> Result<(), AccessError> {
        if let Some(cache) = self.cache.as_ref() {
            cache.set(entity).await?;
        }
        Ok(())
    }

    /// Drop the cached copy, e.g. after a delete.
    pub async fn evict(&self, id: i64) -> Result<(), AccessError> {
        if let Some(cache) = self.cache.as_ref() {
            cache.delete::<E>(id).await?;
        }
        Ok(())
    }

    /// Follow up a committed update of `entity`. Cache failures here never
    /// fail the caller: the store already holds the change.
    pub async fn refresh_after_write(&self, entity: &E) -> CacheSync {
        match self.refresh(entity).await {
            Ok(()) => CacheSync::Current,
            Err(err) => {
                warn!(
                    kind = E::KIND.as_str(),
                    id = entity.id(),
                    error = %err,
                    "cache refresh after write failed, evicting"
                );
                self.evict_after_write(entity.id()).await
            }
        }
    }

    /// Follow up a committed delete or state change of entity `id`.
    pub async fn evict_after_write(&self, id: i64) -> CacheSync {
        if self.cache.is_none() {
            return CacheSync::Current;
        }
        match self.evict(id).await {
            Ok(()) => CacheSync::Evicted,
            Err(err) => {
                counter!(METRIC_CACHE_STALE, "kind" => E::KIND.as_str()).increment(1);
                warn!(
                    kind = E::KIND.as_str(),
                    id,
                    error = %err,
                    "cache eviction after write failed, cached copy may be stale"
                );
                CacheSync::Stale
            }
        }
    }
}
