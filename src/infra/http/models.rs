use serde::{Deserialize, Serialize};

use crate::application::posts::FEED_MAX_LIMIT;
use crate::application::repos::FeedQuery;
use crate::domain::types::SortDirection;

/// Success payloads are wrapped as `{ "data": ... }`.
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub user_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub user_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub follower_id: i64,
}

/// Registration payload. Password hashing belongs to the authentication
/// collaborator, which submits the digest hex encoded.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<SortDirection>,
    pub search: Option<String>,
    /// Comma separated.
    pub tags: Option<String>,
}

impl FeedParams {
    pub fn into_query(self) -> FeedQuery {
        let tags = self
            .tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        FeedQuery {
            limit: self.limit.unwrap_or(FEED_MAX_LIMIT),
            offset: self.offset.unwrap_or(0),
            sort: self.sort.unwrap_or_default(),
            search: self.search.filter(|s| !s.trim().is_empty()),
            tags,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cache: bool,
    pub rate_limit: bool,
}
