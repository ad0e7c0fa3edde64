//! Tag model

use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Maximum length of a tag name, in characters.
pub const TAG_NAME_MAX_LEN: usize = 50;

/// Tag record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Tag {
    pub id: i64,
    pub name: String,
    /// Lower values sort first in tag listings
    pub priority: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Tag reference attached to a memo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct TagSummary {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for TagSummary {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}
