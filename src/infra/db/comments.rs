use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::{Comment, CommentAuthor};

use super::PostgresRepositories;
use super::util::with_timeout;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    content: String,
    created_at: OffsetDateTime,
    username: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
            user: CommentAuthor {
                id: row.user_id,
                username: row.username,
            },
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn create_comment(&self, params: CreateCommentParams) -> Result<Comment, RepoError> {
        let row = with_timeout(
            self.query_timeout(),
            sqlx::query_as::<_, CommentRow>(
                r#"
                WITH inserted AS (
                    INSERT INTO comments (post_id, user_id, content)
                    VALUES ($1, $2, $3)
                    RETURNING id, post_id, user_id, content, created_at
                )
                SELECT i.id, i.post_id, i.user_id, i.content, i.created_at, u.username
                FROM inserted i
                INNER JOIN users u ON u.id = i.user_id
                "#,
            )
            .bind(params.post_id)
            .bind(params.user_id)
            .bind(&params.content)
            .fetch_one(self.pool()),
        )
        .await?;

        Ok(row.into())
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        let rows = with_timeout(
            self.query_timeout(),
            sqlx::query_as::<_, CommentRow>(
                r#"
                SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, u.username
                FROM comments c
                INNER JOIN users u ON u.id = c.user_id
                WHERE c.post_id = $1
                ORDER BY c.created_at DESC, c.id DESC
                "#,
            )
            .bind(post_id)
            .fetch_all(self.pool()),
        )
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}
