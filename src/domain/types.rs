//! Shared domain enumerations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of entity addressed through the access layer.
///
/// Ids are only unique within a kind, so every cache key carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Post,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Post => "post",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_renders_lowercase() {
        assert_eq!(EntityKind::User.to_string(), "user");
        assert_eq!(EntityKind::Post.as_str(), "post");
    }

    #[test]
    fn sort_direction_defaults_to_newest_first() {
        assert_eq!(SortDirection::default().as_sql(), "DESC");
        let parsed: SortDirection = serde_json::from_str("\"asc\"").expect("parse");
        assert_eq!(parsed, SortDirection::Asc);
    }
}
