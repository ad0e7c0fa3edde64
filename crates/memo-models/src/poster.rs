//! Poster model - cached identity of a chat user.

use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::SlackMember;

/// Name stored when the chat API has no value for a poster.
pub const UNKNOWN_POSTER_NAME: &str = "unknown";

/// Poster record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Poster {
    pub id: i64,
    pub user_key: String,
    pub display_name: Option<String>,
    pub real_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Poster values ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterInput {
    pub user_key: String,
    pub display_name: String,
    pub real_name: String,
}

impl PosterInput {
    /// Build a poster from a chat member. Members without an id are skipped.
    pub fn from_member(member: &SlackMember) -> Option<Self> {
        let user_key = member.id.as_deref().filter(|id| !id.trim().is_empty())?;

        let display_name = member
            .profile
            .as_ref()
            .and_then(|p| p.display_name.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_POSTER_NAME);

        let real_name = member
            .real_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_POSTER_NAME);

        Some(Self {
            user_key: user_key.to_string(),
            display_name: display_name.to_string(),
            real_name: real_name.to_string(),
        })
    }
}
