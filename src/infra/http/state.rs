use std::sync::Arc;

use axum::extract::FromRef;

use crate::application::concurrency::{ConflictPolicy, VersionedWriter};
use crate::application::posts::PostService;
use crate::application::rate_limit::RateLimiter;
use crate::application::repos::{CommentsRepo, FollowersRepo, PostsRepo, RolesRepo, UsersRepo};
use crate::application::users::UserService;
use crate::cache::{EntityCache, ReadThrough};
use crate::domain::entities::{Post, User};
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
    pub users: Arc<UserService>,
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub health: HealthState,
}

#[derive(Clone)]
pub struct HealthState {
    pub db: Option<Arc<PostgresRepositories>>,
    pub cache_enabled: bool,
}

impl FromRef<HttpState> for Arc<PostService> {
    fn from_ref(state: &HttpState) -> Self {
        state.posts.clone()
    }
}

impl FromRef<HttpState> for Arc<UserService> {
    fn from_ref(state: &HttpState) -> Self {
        state.users.clone()
    }
}

impl FromRef<HttpState> for HealthState {
    fn from_ref(state: &HttpState) -> Self {
        state.health.clone()
    }
}

impl HttpState {
    /// Wire the services over one store implementing every repository.
    pub fn assemble<S>(
        store: Arc<S>,
        cache: Option<Arc<EntityCache>>,
        policy: ConflictPolicy,
        rate_limiter: Option<Arc<dyn RateLimiter>>,
        db: Option<Arc<PostgresRepositories>>,
    ) -> Self
    where
        S: PostsRepo + UsersRepo + CommentsRepo + FollowersRepo + RolesRepo + 'static,
    {
        let post_reader = ReadThrough::<Post>::new(store.clone(), cache.clone());
        let cache_enabled = post_reader.is_cached();

        let posts = PostService::new(
            store.clone(),
            store.clone(),
            post_reader,
            VersionedWriter::<Post>::with_policy(store.clone(), policy),
        );
        let users = UserService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            ReadThrough::<User>::new(store, cache),
        );

        Self {
            posts: Arc::new(posts),
            users: Arc::new(users),
            rate_limiter,
            health: HealthState { db, cache_enabled },
        }
    }
}
