use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{EntityStore, NewUser, RepoError, UsersRepo};
use crate::domain::entities::{Role, User};

use super::PostgresRepositories;
use super::util::with_timeout;

const DEFAULT_ROLE: &str = "user";

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.email, u.created_at, u.is_active, u.role_id,
           r.name AS role_name, r.description AS role_description, r.level AS role_level
    FROM users u
    INNER JOIN roles r ON r.id = u.role_id
    WHERE u.id = $1
"#;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    created_at: OffsetDateTime,
    is_active: bool,
    role_id: i64,
    role_name: String,
    role_description: String,
    role_level: i32,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
            is_active: row.is_active,
            role_id: row.role_id,
            role: Role {
                id: row.role_id,
                name: row.role_name,
                description: row.role_description,
                level: row.role_level.into(),
            },
        }
    }
}

#[async_trait]
impl EntityStore<User> for PostgresRepositories {
    async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
        let row = with_timeout(
            self.query_timeout(),
            sqlx::query_as::<_, UserRow>(SELECT_USER)
                .bind(id)
                .fetch_one(self.pool()),
        )
        .await?;

        Ok(row.into())
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expires_in: Duration,
    ) -> Result<User, RepoError> {
        let NewUser {
            username,
            email,
            password_hash,
            role_name,
        } = user;
        let role_name = role_name.unwrap_or_else(|| DEFAULT_ROLE.to_string());
        let expiry = OffsetDateTime::now_utc() + expires_in;

        let row = with_timeout(self.query_timeout(), async {
            let mut tx = self.pool().begin().await?;

            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO users (username, password, email, role_id)
                VALUES ($1, $2, $3, (SELECT r.id FROM roles r WHERE r.name = $4))
                RETURNING id
                "#,
            )
            .bind(&username)
            .bind(&password_hash)
            .bind(&email)
            .bind(&role_name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO user_invitations (token, user_id, expiry) VALUES ($1, $2, $3)")
                .bind(token_hash)
                .bind(id)
                .bind(expiry)
                .execute(&mut *tx)
                .await?;

            let row = sqlx::query_as::<_, UserRow>(SELECT_USER)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(row)
        })
        .await?;

        Ok(row.into())
    }

    async fn activate(&self, token_hash: &str) -> Result<i64, RepoError> {
        with_timeout(self.query_timeout(), async {
            let mut tx = self.pool().begin().await?;

            let user_id: i64 = sqlx::query_scalar(
                "SELECT user_id FROM user_invitations WHERE token = $1 AND expiry > $2",
            )
            .bind(token_hash)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(user_id)
        })
        .await
    }
}
