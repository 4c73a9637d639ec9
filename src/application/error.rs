use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::application::repos::RepoError;
use crate::cache::CacheError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

/// Error chain carried on a response so the logging middleware can print it.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Process-level failure reported by the binary before exiting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

/// Errors surfaced by the resource access layer.
///
/// Store and cache failures are never folded into a default value: a cache
/// failure is not a miss and a store failure is not `NotFound`.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Entity absent. For versioned updates this also covers a stale base
    /// version unless the writer was asked to tell the two apart.
    #[error("resource not found")]
    NotFound,
    #[error("conflicting write")]
    Conflict { current_version: Option<i32> },
    #[error("fast-path cache failed: {0}")]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Repo(RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Coarse classification callers render responses from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unavailable,
    Invalid,
    Internal,
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccessError::NotFound => ErrorKind::NotFound,
            AccessError::Conflict { .. } => ErrorKind::Conflict,
            AccessError::Cache(_) => ErrorKind::Unavailable,
            AccessError::Domain(_) => ErrorKind::Invalid,
            AccessError::Repo(repo) => match repo {
                RepoError::NotFound => ErrorKind::NotFound,
                RepoError::Duplicate { .. } | RepoError::Integrity { .. } => ErrorKind::Conflict,
                RepoError::Timeout | RepoError::Unavailable(_) => ErrorKind::Unavailable,
                RepoError::InvalidInput { .. } => ErrorKind::Invalid,
                RepoError::Persistence(_) => ErrorKind::Internal,
            },
        }
    }
}

impl From<RepoError> for AccessError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AccessError::NotFound,
            other => AccessError::Repo(other),
        }
    }
}
