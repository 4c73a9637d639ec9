//! Redis cache backend (`SET key value EX ttl` / `GET key`).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use super::backend::CacheBackend;
use super::error::CacheError;

#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(CacheError::unavailable)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(CacheError::unavailable)?;
        info!(target = "social::cache::redis", "redis cache connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(CacheError::unavailable)?;
        Ok(value.map(Bytes::from))
    }

    async fn set_ex(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // EX only takes whole seconds; anything shorter still needs a live entry.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, value.as_ref(), seconds)
            .await
            .map_err(CacheError::unavailable)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(CacheError::unavailable)?;
        Ok(())
    }
}
