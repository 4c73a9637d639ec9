//! Cache round trips against a running Redis.
//!
//! Marked `#[ignore]`; set `SOCIAL_TEST_REDIS_URL` and run with `--ignored`.

use std::sync::Arc;
use std::time::Duration;

use social::cache::{CacheConfig, EntityCache, RedisBackend};
use social::domain::entities::{Role, User};
use time::OffsetDateTime;
use uuid::Uuid;

fn redis_url() -> String {
    std::env::var("SOCIAL_TEST_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string())
}

fn sample_user(id: i64) -> User {
    User {
        id,
        username: format!("live{id}"),
        email: format!("live{id}@example.com"),
        created_at: OffsetDateTime::now_utc(),
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

#[tokio::test]
#[ignore]
async fn redis_entries_expire_after_ttl() {
    let backend = RedisBackend::connect(&redis_url())
        .await
        .expect("redis should be reachable");
    let config = CacheConfig {
        enabled: true,
        ttl: Duration::from_secs(1),
        key_prefix: format!("social-test-{}:", Uuid::new_v4()),
        ..Default::default()
    };
    let cache = EntityCache::new(Arc::new(backend), &config);

    let user = sample_user(7);
    cache.set(&user).await.expect("set");
    let cached: Option<User> = cache.get(7).await.expect("get");
    assert_eq!(cached, Some(user));

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let expired: Option<User> = cache.get(7).await.expect("get after ttl");
    assert!(expired.is_none());

    cache.delete::<User>(7).await.expect("delete");
}
