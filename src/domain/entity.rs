//! Traits describing what the access layer needs to know about an entity.

use serde::{Serialize, de::DeserializeOwned};

use super::types::EntityKind;

/// A uniquely identified record managed by the authoritative store.
///
/// The serde bounds are what the fast-path cache uses to encode entries; the
/// encoding must round-trip every field.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> i64;
}

/// An entity guarded by optimistic concurrency.
///
/// `version` starts at 0 when the store creates the row and grows by exactly
/// one per accepted update.
pub trait Versioned: Entity {
    fn version(&self) -> i32;

    fn set_version(&mut self, version: i32);
}
