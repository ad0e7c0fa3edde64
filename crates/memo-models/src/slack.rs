//! Chat API payloads and the archive records derived from them.

use serde::{Deserialize, Serialize};

/// Generic chat API envelope. Every response carries `ok`; failures carry `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackEnvelope<T> {
    #[serde(default)]
    pub ok: bool,
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: T,
    pub response_metadata: Option<ResponseMetadata>,
}

/// Cursor information for paginated endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    pub next_cursor: Option<String>,
}

impl ResponseMetadata {
    /// The cursor for the next page, if there is one.
    pub fn cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// Body of `conversations.history` and `conversations.replies`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesBody {
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
}

/// Body of `users.list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembersBody {
    #[serde(default)]
    pub members: Vec<SlackMember>,
}

/// A message as returned by the chat API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub text: String,
    pub user: Option<String>,
    pub ts: String,
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub reactions: Vec<SlackReaction>,
}

impl SlackMessage {
    /// Whether any reaction on this message contains `reaction`.
    pub fn has_reaction(&self, reaction: &str) -> bool {
        self.reactions.iter().any(|r| r.name.contains(reaction))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackReaction {
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

/// A workspace member as returned by `users.list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackMember {
    pub id: Option<String>,
    pub real_name: Option<String>,
    pub profile: Option<SlackProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackProfile {
    pub display_name: Option<String>,
}

/// A channel post selected for archiving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePost {
    pub text: String,
    pub poster_user_key: Option<String>,
    /// Post timestamp; the idempotency key of the resulting memo.
    pub ts: String,
    pub thread_ts: Option<String>,
    pub channel_id: String,
    /// Tag resolved from the channel mapping; `None` when the channel has no tag.
    pub tag_id: Option<i64>,
}

impl ArchivePost {
    pub fn from_message(message: SlackMessage, channel_id: &str, tag_id: Option<i64>) -> Self {
        Self {
            text: message.text,
            poster_user_key: message.user,
            ts: message.ts,
            thread_ts: message.thread_ts,
            channel_id: channel_id.to_string(),
            tag_id,
        }
    }
}

/// A reply inside a thread, archived as a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadReply {
    pub text: String,
    pub poster_user_key: Option<String>,
    /// Reply timestamp; the idempotency key of the resulting comment.
    pub ts: String,
    pub parent_ts: String,
}

impl ThreadReply {
    /// Convert a reply message. The thread root itself is not a reply.
    pub fn from_message(message: SlackMessage, parent_ts: &str) -> Option<Self> {
        if message.ts == parent_ts {
            return None;
        }

        Some(Self {
            text: message.text,
            poster_user_key: message.user,
            ts: message.ts,
            parent_ts: message
                .thread_ts
                .unwrap_or_else(|| parent_ts.to_string()),
        })
    }
}
