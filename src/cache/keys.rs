//! Cache key definitions.

use std::fmt;

use crate::domain::entity::Entity;
use crate::domain::types::EntityKind;

/// Addresses one entity in the fast-path cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub id: i64,
}

impl CacheKey {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn of<E: Entity>(id: i64) -> Self {
        Self::new(E::KIND, id)
    }

    /// Backend key with the deployment prefix applied, e.g. `social:user:7`.
    pub fn render(&self, prefix: &str) -> String {
        format!("{prefix}{self}")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
