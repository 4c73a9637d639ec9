//! Domain layer types and invariants.

pub mod entities;
pub mod entity;
pub mod error;
pub mod types;
