//! Optimistic concurrency for versioned entities.

use std::sync::Arc;

use metrics::counter;
use tracing::warn;

use crate::application::error::AccessError;
use crate::application::repos::{RepoError, VersionedStore};
use crate::domain::entity::Versioned;

const METRIC_VERSION_CONFLICT: &str = "social_version_conflict_total";

/// How a zero-row conditional write is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Report `NotFound` whether the row is gone or its version moved on.
    #[default]
    Ambiguous,
    /// Spend one extra read to report `Conflict` with the current version
    /// when the row still exists.
    Distinguish,
}

/// Applies caller mutations with a single compare-and-set attempt.
///
/// There is no retry: on a stale version the caller must re-read and
/// reapply its change.
pub struct VersionedWriter<E: Versioned> {
    store: Arc<dyn VersionedStore<E>>,
    policy: ConflictPolicy,
}

impl<E: Versioned> Clone for VersionedWriter<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
        }
    }
}

impl<E: Versioned> VersionedWriter<E> {
    pub fn new(store: Arc<dyn VersionedStore<E>>) -> Self {
        Self::with_policy(store, ConflictPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn VersionedStore<E>>, policy: ConflictPolicy) -> Self {
        Self { store, policy }
    }

    /// Persist `entity` if the stored version still equals `entity.version()`.
    ///
    /// On success the in-memory version is replaced with the stored one,
    /// which is exactly one higher. On any failure `entity` is untouched.
    pub async fn update_versioned(&self, entity: &mut E) -> Result<(), AccessError> {
        let expected = entity.version();
        match self.store.update_where_version(entity, expected).await? {
            Some(new_version) => {
                entity.set_version(new_version);
                Ok(())
            }
            None => {
                counter!(METRIC_VERSION_CONFLICT, "kind" => E::KIND.as_str()).increment(1);
                warn!(
                    kind = E::KIND.as_str(),
                    id = entity.id(),
                    expected_version = expected,
                    "versioned update matched no row"
                );
                self.explain_miss(entity.id()).await
            }
        }
    }

    async fn explain_miss(&self, id: i64) -> Result<(), AccessError> {
        match self.policy {
            ConflictPolicy::Ambiguous => Err(AccessError::NotFound),
            ConflictPolicy::Distinguish => match self.store.get_by_id(id).await {
                Ok(current) => Err(AccessError::Conflict {
                    current_version: Some(current.version()),
                }),
                Err(RepoError::NotFound) => Err(AccessError::NotFound),
                Err(err) => Err(err.into()),
            },
        }
    }
}
