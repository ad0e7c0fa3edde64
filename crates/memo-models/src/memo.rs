//! Memo model - a single archived note.

use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::TagSummary;

/// Number of characters kept from a post body when deriving a memo title.
pub const ARCHIVE_TITLE_CHARS: usize = 21;

/// Memo record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Memo {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Timestamp of the chat post this memo was imported from.
    pub slack_ts: Option<String>,
    pub poster_user_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Memo as listed by the query pipeline, with its poster and tags resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MemoSummary {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub slack_ts: Option<String>,
    pub poster_user_key: Option<String>,
    pub poster_display_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub tags: Vec<TagSummary>,
}

/// Derive a memo title from a post body.
///
/// Counts characters rather than bytes so multi-byte text is never split.
pub fn archive_title(text: &str) -> String {
    text.chars().take(ARCHIVE_TITLE_CHARS).collect()
}
