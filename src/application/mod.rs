//! Application services composing the access layer components.

pub mod concurrency;
pub mod error;
pub mod posts;
pub mod rate_limit;
pub mod repos;
pub mod users;
