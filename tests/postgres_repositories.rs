//! Repository tests against PostgreSQL.
//!
//! Marked `#[ignore]`; run with `DATABASE_URL` set and `cargo test -- --ignored`.

use std::time::Duration;

use social::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, EntityStore, FeedQuery, FollowersRepo,
    NewUser, PostsRepo, RepoError, RolesRepo, UsersRepo, VersionedStore,
};
use social::application::users::hash_token;
use social::domain::entities::{Post, User};
use social::infra::db::PostgresRepositories;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

async fn invited_user(repos: &PostgresRepositories, name: &str, token: &str) -> User {
    repos
        .create_and_invite(
            NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: vec![1, 2, 3],
                role_name: None,
            },
            &hash_token(token),
            Duration::from_secs(3600),
        )
        .await
        .expect("create and invite")
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn invitation_activates_user_once(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let user = invited_user(&repos, "alice", "token-a").await;
    assert!(!user.is_active);
    assert_eq!(user.role.name, "user");

    let activated = repos.activate(&hash_token("token-a")).await.expect("activate");
    assert_eq!(activated, user.id);

    let reloaded = EntityStore::<User>::get_by_id(&repos, user.id)
        .await
        .expect("reload");
    assert!(reloaded.is_active);

    let again = repos.activate(&hash_token("token-a")).await;
    assert!(matches!(again, Err(RepoError::NotFound)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn duplicate_email_is_rejected_case_insensitively(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    invited_user(&repos, "bob", "token-b").await;

    let err = repos
        .create_and_invite(
            NewUser {
                username: "bobby".to_string(),
                email: "BOB@example.com".to_string(),
                password_hash: vec![0],
                role_name: None,
            },
            &hash_token("token-c"),
            Duration::from_secs(3600),
        )
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn conditional_update_bumps_version_once(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = invited_user(&repos, "carol", "token-d").await;

    let post = repos
        .create_post(CreatePostParams {
            title: "first".to_string(),
            content: "body".to_string(),
            user_id: author.id,
            tags: vec!["rust".to_string()],
        })
        .await
        .expect("create post");
    assert_eq!(post.version, 0);

    let mut edited = post.clone();
    edited.content = "edited".to_string();
    let version = repos
        .update_where_version(&edited, 0)
        .await
        .expect("update");
    assert_eq!(version, Some(1));

    let stale = repos
        .update_where_version(&edited, 0)
        .await
        .expect("stale update");
    assert_eq!(stale, None);

    let stored = EntityStore::<Post>::get_by_id(&repos, post.id)
        .await
        .expect("stored");
    assert_eq!(stored.version, 1);
    assert_eq!(stored.content, "edited");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn feed_includes_followed_authors_with_counts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let dave = invited_user(&repos, "dave", "token-e").await;
    let erin = invited_user(&repos, "erin", "token-f").await;

    let post = repos
        .create_post(CreatePostParams {
            title: "tagged".to_string(),
            content: "searchable body".to_string(),
            user_id: dave.id,
            tags: vec!["go".to_string(), "db".to_string()],
        })
        .await
        .expect("create post");
    repos
        .create_comment(CreateCommentParams {
            post_id: post.id,
            user_id: erin.id,
            content: "hi".to_string(),
        })
        .await
        .expect("comment");

    let before = repos
        .user_feed(erin.id, &FeedQuery::default())
        .await
        .expect("feed");
    assert!(before.is_empty());

    repos.follow(erin.id, dave.id).await.expect("follow");
    let dup = repos.follow(erin.id, dave.id).await;
    assert!(matches!(dup, Err(RepoError::Duplicate { .. })));

    let feed = repos
        .user_feed(
            erin.id,
            &FeedQuery {
                search: Some("SEARCHABLE".to_string()),
                tags: vec!["go".to_string()],
                ..FeedQuery::default()
            },
        )
        .await
        .expect("feed");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].username, "dave");
    assert_eq!(feed[0].comments_count, 1);

    let comments = repos.list_for_post(post.id).await.expect("comments");
    assert_eq!(comments[0].user.username, "erin");

    let role = repos.get_by_name("admin").await.expect("role");
    assert_eq!(role.level, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn deleting_missing_post_is_not_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let err = repos.delete_post(123_456).await.expect_err("missing");
    assert!(matches!(err, RepoError::NotFound));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn health_check_gives_up_after_query_timeout(pool: PgPool) {
    let single = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(pool.connect_options().as_ref().clone())
        .await
        .expect("single-connection pool");
    let repos = PostgresRepositories::new(single.clone())
        .with_query_timeout(Duration::from_millis(100));

    let held = single.acquire().await.expect("hold the only connection");
    let started = std::time::Instant::now();
    let err = repos.health_check().await.expect_err("pool exhausted");
    assert!(matches!(err, RepoError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(5));

    drop(held);
    repos.health_check().await.expect("healthy again");
}
