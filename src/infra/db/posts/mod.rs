mod types;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::application::repos::{
    CreatePostParams, EntityStore, FeedQuery, PostsRepo, RepoError, VersionedStore,
};
use crate::domain::entities::{Post, PostWithMetadata};

use super::PostgresRepositories;
use super::util::with_timeout;
use types::{FeedRow, PostRow};

const POST_COLUMNS: &str =
    "id, title, content, user_id, tags, version, created_at, updated_at";

#[async_trait]
impl EntityStore<Post> for PostgresRepositories {
    async fn get_by_id(&self, id: i64) -> Result<Post, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = with_timeout(
            self.query_timeout(),
            sqlx::query_as::<_, PostRow>(&sql)
                .bind(id)
                .fetch_one(self.pool()),
        )
        .await?;

        Ok(row.into())
    }
}

#[async_trait]
impl VersionedStore<Post> for PostgresRepositories {
    async fn update_where_version(
        &self,
        entity: &Post,
        expected_version: i32,
    ) -> Result<Option<i32>, RepoError> {
        with_timeout(
            self.query_timeout(),
            sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE posts
                SET title = $1, content = $2, updated_at = $3, version = version + 1
                WHERE id = $4 AND version = $5
                RETURNING version
                "#,
            )
            .bind(&entity.title)
            .bind(&entity.content)
            .bind(entity.updated_at)
            .bind(entity.id)
            .bind(expected_version)
            .fetch_optional(self.pool()),
        )
        .await
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<Post, RepoError> {
        let CreatePostParams {
            title,
            content,
            user_id,
            tags,
        } = params;

        let sql = format!(
            "INSERT INTO posts (title, content, user_id, tags) \
             VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        );
        let row = with_timeout(
            self.query_timeout(),
            sqlx::query_as::<_, PostRow>(&sql)
                .bind(title)
                .bind(content)
                .bind(user_id)
                .bind(tags)
                .fetch_one(self.pool()),
        )
        .await?;

        Ok(row.into())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let result = with_timeout(
            self.query_timeout(),
            sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(id)
                .execute(self.pool()),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<PostWithMetadata>, RepoError> {
        let mut qb = feed_query(user_id, query);
        let rows = with_timeout(
            self.query_timeout(),
            qb.build_query_as::<FeedRow>().fetch_all(self.pool()),
        )
        .await?;

        Ok(rows.into_iter().map(PostWithMetadata::from).collect())
    }
}

/// Posts written by `user_id` or by anyone `user_id` follows.
fn feed_query<'q>(user_id: i64, query: &'q FeedQuery) -> QueryBuilder<'q, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT p.id, p.title, p.content, p.user_id, p.tags, p.version, \
         p.created_at, p.updated_at, u.username, COUNT(c.id) AS comments_count \
         FROM posts p \
         INNER JOIN users u ON u.id = p.user_id \
         LEFT JOIN comments c ON c.post_id = p.id \
         WHERE (p.user_id = ",
    );
    qb.push_bind(user_id);
    qb.push(" OR p.user_id IN (SELECT f.user_id FROM followers f WHERE f.follower_id = ");
    qb.push_bind(user_id);
    qb.push("))");

    if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (p.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR p.content ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    if !query.tags.is_empty() {
        qb.push(" AND p.tags @> ");
        qb.push_bind(&query.tags);
        qb.push("::varchar[]");
    }

    qb.push(" GROUP BY p.id, u.username ORDER BY p.created_at ");
    qb.push(query.sort.as_sql());
    qb.push(", p.id ");
    qb.push(query.sort.as_sql());
    qb.push(" LIMIT ");
    qb.push_bind(query.limit);
    qb.push(" OFFSET ");
    qb.push_bind(query.offset);
    qb
}
