//! Resource access layer for a social network backend.
//!
//! Entity reads go through a read-through cache in front of PostgreSQL,
//! post edits are guarded by optimistic version checks, and the HTTP surface
//! is admission-controlled by a fixed-window rate limiter.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
