use std::future::Future;
use std::time::Duration;

use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates foreign key constraint")
                || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other @ (sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
            RepoError::Unavailable(other.to_string())
        }
        other => RepoError::from_persistence(other),
    }
}

/// Run a statement (or a whole transaction) under `limit`.
///
/// Elapsing drops `fut`, which cancels the in-flight query and rolls back an
/// open transaction when its guard is dropped.
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(map_sqlx_error),
        Err(_) => Err(RepoError::Timeout),
    }
}
