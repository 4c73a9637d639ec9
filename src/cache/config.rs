//! Cache configuration.
//!
//! Controls the fast-path entity cache via the `[cache]` table.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

pub(crate) const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
pub(crate) const DEFAULT_TTL_SECS: u64 = 300;
/// Longest accepted entry lifetime (30 days).
pub(crate) const MAX_TTL_SECS: u64 = 60 * 60 * 24 * 30;
pub(crate) const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 500;
pub(crate) const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false, reads go straight to the authoritative store.
    pub enabled: bool,
    pub backend: CacheBackendKind,
    pub redis_url: String,
    /// Lifetime of an entry, measured from the write.
    pub ttl: Duration,
    /// Upper bound on a single backend call.
    pub operation_timeout: Duration,
    /// Prepended to every backend key.
    pub key_prefix: String,
    /// Maximum entries held by the in-process backend.
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: CacheBackendKind::Redis,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            key_prefix: String::new(),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            ttl: settings.ttl,
            operation_timeout: settings.operation_timeout,
            key_prefix: settings.key_prefix.clone(),
            memory_capacity: settings.memory_capacity,
        }
    }
}

impl CacheConfig {
    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
