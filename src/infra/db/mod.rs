//! Postgres-backed repository implementations.

mod comments;
mod followers;
mod posts;
mod roles;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::RepoError;

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
    query_timeout: Duration,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Bound every statement issued through these repositories.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    /// Ping the database, waiting no longer than the query timeout for a
    /// pooled connection and the round trip together.
    pub async fn health_check(&self) -> Result<(), RepoError> {
        util::with_timeout(self.query_timeout, async {
            query("SELECT 1").execute(self.pool()).await.map(|_| ())
        })
        .await
    }
}
