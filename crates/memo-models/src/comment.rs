//! Comment model

use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Maximum comment length, in characters.
pub const COMMENT_MAX_LEN: usize = 1024;

/// Comment attached to a memo. Imported comments come from thread replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Comment {
    pub id: i64,
    pub memo_id: i64,
    pub content: String,
    pub poster_user_key: Option<String>,
    /// Timestamp of the thread root this reply belongs to.
    pub slack_parent_ts: Option<String>,
    /// Timestamp of the reply itself; unique.
    pub slack_ts: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
