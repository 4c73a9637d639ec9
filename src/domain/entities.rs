//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::entity::{Entity, Versioned};
use super::types::EntityKind;

pub const POST_TITLE_MAX_CHARS: usize = 100;
pub const POST_CONTENT_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_active: bool,
    pub role_id: i64,
    pub role: Role,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub tags: Vec<String>,
    pub version: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Entity for Post {
    const KIND: EntityKind = EntityKind::Post;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Versioned for Post {
    fn version(&self) -> i32 {
        self.version
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: CommentAuthor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follower {
    pub user_id: i64,
    pub follower_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A post as it appears in a user's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithMetadata {
    #[serde(flatten)]
    pub post: Post,
    pub username: String,
    pub comments_count: i64,
}

/// A post together with its comments, as served to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn post_json_roundtrip_keeps_version_and_timestamps() {
        let post = Post {
            id: 42,
            title: "hello".to_string(),
            content: "world".to_string(),
            user_id: 7,
            tags: vec!["rust".to_string()],
            version: 3,
            created_at: datetime!(2024-05-01 10:00 UTC),
            updated_at: datetime!(2024-05-02 11:30 UTC),
        };

        let encoded = serde_json::to_string(&post).expect("encode");
        let decoded: Post = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, post);
        assert_eq!(Versioned::version(&decoded), 3);
    }

    #[test]
    fn feed_row_flattens_post_fields() {
        let row = PostWithMetadata {
            post: Post {
                id: 1,
                title: "t".to_string(),
                content: "c".to_string(),
                user_id: 2,
                tags: Vec::new(),
                version: 0,
                created_at: datetime!(2024-01-01 0:00 UTC),
                updated_at: datetime!(2024-01-01 0:00 UTC),
            },
            username: "ada".to_string(),
            comments_count: 5,
        };

        let value = serde_json::to_value(&row).expect("encode");
        assert_eq!(value["id"], 1);
        assert_eq!(value["username"], "ada");
        assert_eq!(value["comments_count"], 5);
    }
}
