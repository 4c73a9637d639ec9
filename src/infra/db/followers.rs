use async_trait::async_trait;

use crate::application::repos::{FollowersRepo, RepoError};

use super::PostgresRepositories;
use super::util::with_timeout;

#[async_trait]
impl FollowersRepo for PostgresRepositories {
    async fn follow(&self, follower_id: i64, user_id: i64) -> Result<(), RepoError> {
        with_timeout(
            self.query_timeout(),
            sqlx::query("INSERT INTO followers (follower_id, user_id) VALUES ($1, $2)")
                .bind(follower_id)
                .bind(user_id)
                .execute(self.pool()),
        )
        .await?;
        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, user_id: i64) -> Result<(), RepoError> {
        with_timeout(
            self.query_timeout(),
            sqlx::query("DELETE FROM followers WHERE follower_id = $1 AND user_id = $2")
                .bind(follower_id)
                .bind(user_id)
                .execute(self.pool()),
        )
        .await?;
        Ok(())
    }
}
