use async_trait::async_trait;

use crate::application::repos::{RepoError, RolesRepo};
use crate::domain::entities::Role;

use super::PostgresRepositories;
use super::util::with_timeout;

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    description: String,
    level: i32,
}

#[async_trait]
impl RolesRepo for PostgresRepositories {
    async fn get_by_name(&self, name: &str) -> Result<Role, RepoError> {
        let row = with_timeout(
            self.query_timeout(),
            sqlx::query_as::<_, RoleRow>(
                "SELECT id, name, description, level FROM roles WHERE name = $1",
            )
            .bind(name)
            .fetch_one(self.pool()),
        )
        .await?;

        Ok(Role {
            id: row.id,
            name: row.name,
            description: row.description,
            level: row.level.into(),
        })
    }
}
