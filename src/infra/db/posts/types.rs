use time::OffsetDateTime;

use crate::domain::entities::{Post, PostWithMetadata};

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) user_id: i64,
    pub(crate) tags: Vec<String>,
    pub(crate) version: i32,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            user_id: row.user_id,
            tags: row.tags,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FeedRow {
    #[sqlx(flatten)]
    pub(crate) post: PostRow,
    pub(crate) username: String,
    pub(crate) comments_count: i64,
}

impl From<FeedRow> for PostWithMetadata {
    fn from(row: FeedRow) -> Self {
        Self {
            post: row.post.into(),
            username: row.username,
            comments_count: row.comments_count,
        }
    }
}
