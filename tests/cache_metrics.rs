//! Metric emission from the cache, the versioned writer and the limiter.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serial_test::serial;
use social::application::concurrency::VersionedWriter;
use social::application::rate_limit::{FixedWindowLimiter, RateLimiter};
use social::application::repos::{CreatePostParams, EntityStore, PostsRepo};
use social::cache::{
    CacheBackend, CacheConfig, CacheError, CacheSync, EntityCache, MemoryBackend, ReadThrough,
};
use social::domain::entities::{Post, User};
use social::infra::memory::InMemoryStore;

static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();

fn snapshotter() -> &'static Snapshotter {
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder
            .install()
            .expect("debug metrics recorder should install in this test process");
        snapshotter
    })
}

fn counter_value(name: &str, kind: Option<&str>) -> u64 {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(composite_key, _, _, _)| {
            let key = composite_key.key();
            key.name() == name
                && kind.is_none_or(|kind| {
                    key.labels()
                        .any(|label| label.key() == "kind" && label.value() == kind)
                })
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(value) => value,
            _ => 0,
        })
        .sum()
}

#[tokio::test]
#[serial]
async fn cache_reads_count_hits_misses_and_errors() {
    snapshotter();

    let store = Arc::new(InMemoryStore::new());
    let user = store.seed_user("metrics", "metrics@example.com").expect("seed");

    let config = CacheConfig {
        enabled: true,
        ..Default::default()
    };
    let backend = Arc::new(MemoryBackend::new(config.memory_capacity_non_zero()));
    let cache = Arc::new(EntityCache::new(backend.clone(), &config));
    let reader = ReadThrough::<User>::new(store, Some(cache.clone()));

    reader.get(user.id).await.expect("miss then store");
    reader.get(user.id).await.expect("hit");

    backend
        .set_ex("user:999", Bytes::from_static(b"not json"), Duration::from_secs(60))
        .await
        .expect("raw set");
    cache
        .get::<User>(999)
        .await
        .expect_err("undecodable entry is an error");

    assert!(counter_value("social_cache_miss_total", Some("user")) >= 1);
    assert!(counter_value("social_cache_hit_total", Some("user")) >= 1);
    assert!(counter_value("social_cache_error_total", Some("user")) >= 1);
}

#[tokio::test]
#[serial]
async fn stale_writes_and_denials_are_counted() {
    snapshotter();

    let store = Arc::new(InMemoryStore::new());
    let author = store.seed_user("author", "author@example.com").expect("seed");
    let post = store
        .create_post(CreatePostParams {
            title: "t".to_string(),
            content: "c".to_string(),
            user_id: author.id,
            tags: Vec::new(),
        })
        .await
        .expect("create");
    store.touch_post(post.id);

    let writer = VersionedWriter::<Post>::new(store.clone());
    let mut stale = post.clone();
    writer
        .update_versioned(&mut stale)
        .await
        .expect_err("stale write");
    let current = EntityStore::<Post>::get_by_id(store.as_ref(), post.id)
        .await
        .expect("current");
    assert_eq!(current.version, 1);

    let limiter = FixedWindowLimiter::new(1, Duration::from_secs(5));
    assert!(limiter.allow("10.0.0.1").permitted);
    assert!(!limiter.allow("10.0.0.1").permitted);

    assert!(counter_value("social_version_conflict_total", Some("post")) >= 1);
    assert!(counter_value("social_rate_limit_denied_total", None) >= 1);
}

struct Unreachable;

#[async_trait]
impl CacheBackend for Unreachable {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::Unavailable("unreachable".to_string()))
    }

    async fn set_ex(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("unreachable".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("unreachable".to_string()))
    }
}

#[tokio::test]
#[serial]
async fn unsettled_cache_after_write_is_counted() {
    snapshotter();

    let store = Arc::new(InMemoryStore::new());
    let user = store.seed_user("stale", "stale@example.com").expect("seed");
    let cache = Arc::new(EntityCache::new(
        Arc::new(Unreachable),
        &CacheConfig::default(),
    ));
    let reader = ReadThrough::<User>::new(store, Some(cache));

    assert_eq!(reader.refresh_after_write(&user).await, CacheSync::Stale);
    assert!(counter_value("social_cache_stale_total", Some("user")) >= 1);
}
