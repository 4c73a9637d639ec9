//! Router-level tests over the in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use social::application::concurrency::ConflictPolicy;
use social::application::rate_limit::{FixedWindowLimiter, RateLimiter};
use social::cache::{CacheConfig, EntityCache, MemoryBackend};
use social::infra::http::{HttpState, build_router};
use social::infra::memory::InMemoryStore;
use tower::ServiceExt;

fn app(store: Arc<InMemoryStore>, limiter: Option<Arc<dyn RateLimiter>>) -> Router {
    let config = CacheConfig {
        enabled: true,
        ..Default::default()
    };
    let backend = Arc::new(MemoryBackend::new(config.memory_capacity_non_zero()));
    let cache = Arc::new(EntityCache::new(backend, &config));
    build_router(HttpState::assemble(
        store,
        Some(cache),
        ConflictPolicy::default(),
        limiter,
        None,
    ))
}

fn request(method: Method, uri: &str, body: Option<Value>, peer: SocketAddr) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(peer));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

fn peer(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last_octet], 40_000))
}

async fn send(router: &Router, req: Request<Body>) -> Response {
    router.clone().oneshot(req).await.expect("router should respond")
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    serde_json::from_slice(&bytes).expect("body should be json")
}

#[tokio::test]
async fn post_lifecycle_with_versioned_update() {
    let store = Arc::new(InMemoryStore::new());
    let author = store.seed_user("author", "author@example.com").expect("seed");
    let router = app(store.clone(), None);

    let created = send(
        &router,
        request(
            Method::POST,
            "/v1/posts",
            Some(json!({
                "title": "hello",
                "content": "world",
                "user_id": author.id,
                "tags": ["rust"]
            })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = json_body(created).await;
    let id = created["data"]["id"].as_i64().expect("post id");
    assert_eq!(created["data"]["version"], 0);

    let fetched = send(&router, request(Method::GET, &format!("/v1/posts/{id}"), None, peer(1))).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = json_body(fetched).await;
    assert_eq!(fetched["data"]["title"], "hello");
    assert_eq!(fetched["data"]["comments"], json!([]));

    let updated = send(
        &router,
        request(
            Method::PATCH,
            &format!("/v1/posts/{id}"),
            Some(json!({ "content": "edited", "version": 0 })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = json_body(updated).await;
    assert_eq!(updated["data"]["version"], 1);

    let stale = send(
        &router,
        request(
            Method::PATCH,
            &format!("/v1/posts/{id}"),
            Some(json!({ "content": "stale", "version": 0 })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(stale.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(stale).await["error"]["code"], "conflict");

    let missing = send(
        &router,
        request(
            Method::PATCH,
            "/v1/posts/9999",
            Some(json!({ "content": "nobody home", "version": 0 })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let after = send(&router, request(Method::GET, &format!("/v1/posts/{id}"), None, peer(1))).await;
    let after = json_body(after).await;
    assert_eq!(after["data"]["content"], "edited");

    let deleted = send(&router, request(Method::DELETE, &format!("/v1/posts/{id}"), None, peer(1))).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = send(&router, request(Method::GET, &format!("/v1/posts/{id}"), None, peer(1))).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    let gone = json_body(gone).await;
    assert_eq!(gone["error"]["code"], "not_found");
}

#[tokio::test]
async fn invalid_post_is_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let author = store.seed_user("author", "author@example.com").expect("seed");
    let router = app(store, None);

    let response = send(
        &router,
        request(
            Method::POST,
            "/v1/posts",
            Some(json!({ "title": "", "content": "x", "user_id": author.id })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn comments_and_follow_feed() {
    let store = Arc::new(InMemoryStore::new());
    let alice = store.seed_user("alice", "alice@example.com").expect("seed");
    let bob = store.seed_user("bob", "bob@example.com").expect("seed");
    let router = app(store, None);

    let created = send(
        &router,
        request(
            Method::POST,
            "/v1/posts",
            Some(json!({ "title": "t", "content": "c", "user_id": alice.id, "tags": ["go"] })),
            peer(1),
        ),
    )
    .await;
    let post_id = json_body(created).await["data"]["id"]
        .as_i64()
        .expect("post id");

    let comment = send(
        &router,
        request(
            Method::POST,
            &format!("/v1/posts/{post_id}/comments"),
            Some(json!({ "user_id": bob.id, "content": "nice" })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(comment.status(), StatusCode::CREATED);

    let comments = send(
        &router,
        request(Method::GET, &format!("/v1/posts/{post_id}/comments"), None, peer(1)),
    )
    .await;
    let comments = json_body(comments).await;
    assert_eq!(comments["data"][0]["user"]["username"], "bob");

    let self_follow = send(
        &router,
        request(
            Method::PUT,
            &format!("/v1/users/{}/follow", bob.id),
            Some(json!({ "follower_id": bob.id })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(self_follow.status(), StatusCode::CONFLICT);

    let follow = send(
        &router,
        request(
            Method::PUT,
            &format!("/v1/users/{}/follow", alice.id),
            Some(json!({ "follower_id": bob.id })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(follow.status(), StatusCode::NO_CONTENT);

    let again = send(
        &router,
        request(
            Method::PUT,
            &format!("/v1/users/{}/follow", alice.id),
            Some(json!({ "follower_id": bob.id })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let feed = send(
        &router,
        request(
            Method::GET,
            &format!("/v1/users/{}/feed?tags=go&limit=5", bob.id),
            None,
            peer(1),
        ),
    )
    .await;
    assert_eq!(feed.status(), StatusCode::OK);
    let feed = json_body(feed).await;
    assert_eq!(feed["data"][0]["id"], post_id);
    assert_eq!(feed["data"][0]["username"], "alice");
    assert_eq!(feed["data"][0]["comments_count"], 1);

    let unfollow = send(
        &router,
        request(
            Method::PUT,
            &format!("/v1/users/{}/unfollow", alice.id),
            Some(json!({ "follower_id": bob.id })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(unfollow.status(), StatusCode::NO_CONTENT);

    let user = send(&router, request(Method::GET, &format!("/v1/users/{}", alice.id), None, peer(1))).await;
    assert_eq!(user.status(), StatusCode::OK);
    assert_eq!(json_body(user).await["data"]["username"], "alice");
}

#[tokio::test]
async fn registration_then_activation_refreshes_cached_user() {
    let router = app(Arc::new(InMemoryStore::new()), None);

    let registered = send(
        &router,
        request(
            Method::POST,
            "/v1/authentication/user",
            Some(json!({
                "username": "grace",
                "email": "grace@example.com",
                "password_hash": "deadbeef"
            })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(registered.status(), StatusCode::CREATED);
    let registered = json_body(registered).await;
    let user_id = registered["data"]["user"]["id"].as_i64().expect("user id");
    let token = registered["data"]["token"]
        .as_str()
        .expect("token")
        .to_string();
    assert_eq!(registered["data"]["user"]["role"]["name"], "user");

    let pending = send(&router, request(Method::GET, &format!("/v1/users/{user_id}"), None, peer(1))).await;
    assert_eq!(json_body(pending).await["data"]["is_active"], false);

    let activated = send(
        &router,
        request(Method::PUT, &format!("/v1/users/activate/{token}"), None, peer(1)),
    )
    .await;
    assert_eq!(activated.status(), StatusCode::NO_CONTENT);

    let active = send(&router, request(Method::GET, &format!("/v1/users/{user_id}"), None, peer(1))).await;
    assert_eq!(json_body(active).await["data"]["is_active"], true);
}

#[tokio::test]
async fn registration_rejects_unknown_role_and_bad_hash() {
    let router = app(Arc::new(InMemoryStore::new()), None);

    let unknown_role = send(
        &router,
        request(
            Method::POST,
            "/v1/authentication/user",
            Some(json!({
                "username": "mallory",
                "email": "mallory@example.com",
                "password_hash": "00ff",
                "role": "superuser"
            })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(unknown_role.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(unknown_role).await["error"]["code"], "invalid_input");

    let bad_hash = send(
        &router,
        request(
            Method::POST,
            "/v1/authentication/user",
            Some(json!({
                "username": "mallory",
                "email": "mallory@example.com",
                "password_hash": "not hex"
            })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(bad_hash.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(bad_hash).await["error"]["code"], "bad_request");

    let moderator = send(
        &router,
        request(
            Method::POST,
            "/v1/authentication/user",
            Some(json!({
                "username": "mod",
                "email": "mod@example.com",
                "password_hash": "00ff",
                "role": "moderator"
            })),
            peer(1),
        ),
    )
    .await;
    assert_eq!(moderator.status(), StatusCode::CREATED);
    assert_eq!(
        json_body(moderator).await["data"]["user"]["role"]["level"],
        2
    );
}

#[tokio::test]
async fn unknown_activation_token_is_not_found() {
    let router = app(Arc::new(InMemoryStore::new()), None);
    let response = send(
        &router,
        request(Method::PUT, "/v1/users/activate/not-a-token", None, peer(1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn peer_over_limit_gets_429_with_retry_after() {
    let limiter: Arc<dyn RateLimiter> =
        Arc::new(FixedWindowLimiter::new(2, Duration::from_secs(5)));
    let router = app(Arc::new(InMemoryStore::new()), Some(limiter));

    for _ in 0..2 {
        let ok = send(&router, request(Method::GET, "/v1/health", None, peer(7))).await;
        assert_eq!(ok.status(), StatusCode::OK);
    }

    tokio::time::advance(Duration::from_millis(1_500)).await;

    let denied = send(&router, request(Method::GET, "/v1/health", None, peer(7))).await;
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        denied
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
        Some("4")
    );
    let body = json_body(denied).await;
    assert_eq!(body["error"]["code"], "rate_limited");

    let other = send(&router, request(Method::GET, "/v1/health", None, peer(8))).await;
    assert_eq!(other.status(), StatusCode::OK, "limits are per peer");

    tokio::time::advance(Duration::from_secs(4)).await;
    let reopened = send(&router, request(Method::GET, "/v1/health", None, peer(7))).await;
    assert_eq!(reopened.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_enabled_layers() {
    let router = app(Arc::new(InMemoryStore::new()), None);
    let response = send(&router, request(Method::GET, "/v1/health", None, peer(1))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["cache"], true);
    assert_eq!(body["data"]["rate_limit"], false);
}
