//! Fast-path entity cache and the cache-aside read path.
//!
//! - [`EntityCache`] stores JSON-encoded entities under `"{kind}:{id}"` keys
//!   with a fixed time-to-live, on top of any [`CacheBackend`].
//! - [`ReadThrough`] serves reads from the cache and falls back to the
//!   authoritative store on a miss, populating the cache afterwards.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "redis"
//! redis_url = "redis://localhost:6379/0"
//! ttl_seconds = 300
//! ```

mod backend;
mod codec;
mod config;
mod error;
mod keys;
pub(crate) mod lock;
mod memory;
mod read_through;
mod redis;
mod store;

pub use backend::CacheBackend;
pub use codec::{decode, encode};
pub use self::config::{CacheBackendKind, CacheConfig};
pub(crate) use self::config::{
    DEFAULT_MEMORY_CAPACITY, DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_REDIS_URL, DEFAULT_TTL_SECS,
    MAX_TTL_SECS,
};
pub use error::CacheError;
pub use keys::CacheKey;
pub use memory::MemoryBackend;
pub use read_through::{CacheSync, ReadThrough};
pub use self::redis::RedisBackend;
pub use store::EntityCache;
