//! Repository traits describing persistence adapters.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Comment, Post, PostWithMetadata, Role, User};
use crate::domain::entity::{Entity, Versioned};
use crate::domain::types::SortDirection;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Point reads by id for one entity kind.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Returns `RepoError::NotFound` when no row has this id.
    async fn get_by_id(&self, id: i64) -> Result<E, RepoError>;
}

/// Conditional writes for entities guarded by a version stamp.
#[async_trait]
pub trait VersionedStore<E: Versioned>: EntityStore<E> {
    /// Persist the mutable fields of `entity` only if the stored version still
    /// equals `expected_version`, bumping it by one in the same statement.
    ///
    /// `Ok(None)` means zero rows matched: either the row is gone or its
    /// version moved on. The two cases are not told apart here.
    async fn update_where_version(
        &self,
        entity: &E,
        expected_version: i32,
    ) -> Result<Option<i32>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub limit: i64,
    pub offset: i64,
    pub sort: SortDirection,
    pub search: Option<String>,
    pub tags: Vec<String>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            sort: SortDirection::Desc,
            search: None,
            tags: Vec::new(),
        }
    }
}

#[async_trait]
pub trait PostsRepo: VersionedStore<Post> {
    async fn create_post(&self, params: CreatePostParams) -> Result<Post, RepoError>;

    /// Returns `RepoError::NotFound` when nothing was deleted.
    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;

    async fn user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<PostWithMetadata>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Already hashed by the authentication collaborator.
    pub password_hash: Vec<u8>,
    pub role_name: Option<String>,
}

#[async_trait]
pub trait UsersRepo: EntityStore<User> {
    /// Create the user and its invitation in one transaction.
    ///
    /// `token_hash` is the hex sha256 of the token mailed to the user.
    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expires_in: Duration,
    ) -> Result<User, RepoError>;

    /// Activate the user owning an unexpired invitation and drop its
    /// invitations. Returns the activated user's id.
    async fn activate(&self, token_hash: &str) -> Result<i64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams) -> Result<Comment, RepoError>;

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError>;
}

#[async_trait]
pub trait FollowersRepo: Send + Sync {
    /// Returns `RepoError::Duplicate` when the pair already exists.
    async fn follow(&self, follower_id: i64, user_id: i64) -> Result<(), RepoError>;

    async fn unfollow(&self, follower_id: i64, user_id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait RolesRepo: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Role, RepoError>;
}
