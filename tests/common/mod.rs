//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use memo_archive::config::{ChannelConfig, ChannelTagMap};
use memo_archive::db::{self, DbPool};
use memo_archive::models::{SlackMember, SlackMessage, SlackReaction};
use memo_archive::services::{ChatSource, ImportService, ImportSettings};
use memo_archive::{AppState, Error, Result};

// ============================================================================
// Database
// ============================================================================

/// Create an in-memory database with the schema applied.
pub async fn setup_test_db() -> DbPool {
    let pool = db::init_pool(":memory:")
        .await
        .expect("Failed to create test database");
    db::initialize_schema(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

pub async fn create_test_tag(pool: &DbPool, name: &str, priority: i64) -> i64 {
    db::create_tag(
        pool,
        db::CreateTag {
            name: name.to_string(),
            priority,
        },
    )
    .await
    .expect("Failed to create test tag")
    .id
}

pub async fn create_test_memo(pool: &DbPool, title: &str, content: &str, tag_ids: &[i64]) -> i64 {
    db::create_memo(
        pool,
        db::CreateMemo {
            title: title.to_string(),
            content: content.to_string(),
            tag_ids: tag_ids.to_vec(),
        },
    )
    .await
    .expect("Failed to create test memo")
    .id
}

/// Row counts of every archived table: (memos, memo_tags, comments).
pub async fn entity_counts(pool: &DbPool) -> (i64, i64, i64) {
    (
        db::count_memos(pool).await.unwrap(),
        db::count_memo_tags(pool).await.unwrap(),
        db::count_comments(pool).await.unwrap(),
    )
}

// ============================================================================
// Chat source
// ============================================================================

/// In-memory chat source. Channels or threads without an entry fail.
#[derive(Default)]
pub struct FakeChatSource {
    pub history: Mutex<HashMap<String, Vec<SlackMessage>>>,
    pub replies: Mutex<HashMap<String, Vec<SlackMessage>>>,
    pub members: Mutex<Vec<SlackMember>>,
    /// Stall every thread fetch for this long.
    pub reply_delay: Mutex<Option<Duration>>,
}

impl FakeChatSource {
    pub fn set_history(&self, channel_id: &str, messages: Vec<SlackMessage>) {
        self.history
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), messages);
    }

    pub fn set_replies(&self, thread_ts: &str, messages: Vec<SlackMessage>) {
        self.replies
            .lock()
            .unwrap()
            .insert(thread_ts.to_string(), messages);
    }

    pub fn remove_replies(&self, thread_ts: &str) {
        self.replies.lock().unwrap().remove(thread_ts);
    }

    pub fn delay_replies(&self, delay: Duration) {
        *self.reply_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl ChatSource for FakeChatSource {
    async fn channel_history(&self, channel_id: &str) -> Result<Vec<SlackMessage>> {
        self.history
            .lock()
            .unwrap()
            .get(channel_id)
            .cloned()
            .ok_or_else(|| Error::ChatApi("channel_not_found".into()))
    }

    async fn thread_replies(&self, _channel_id: &str, thread_ts: &str) -> Result<Vec<SlackMessage>> {
        let delay = *self.reply_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .get(thread_ts)
            .cloned()
            .ok_or_else(|| Error::ChatApi("thread_not_found".into()))
    }

    async fn users(&self) -> Result<Vec<SlackMember>> {
        Ok(self.members.lock().unwrap().clone())
    }
}

pub fn archived_message(ts: &str, user: &str, text: &str) -> SlackMessage {
    SlackMessage {
        text: text.to_string(),
        user: Some(user.to_string()),
        ts: ts.to_string(),
        thread_ts: None,
        reactions: vec![SlackReaction {
            name: "archive".to_string(),
            count: 1,
        }],
    }
}

pub fn thread_root(ts: &str, user: &str, text: &str) -> SlackMessage {
    SlackMessage {
        thread_ts: Some(ts.to_string()),
        ..archived_message(ts, user, text)
    }
}

pub fn reply(ts: &str, parent_ts: &str, user: &str, text: &str) -> SlackMessage {
    SlackMessage {
        text: text.to_string(),
        user: Some(user.to_string()),
        ts: ts.to_string(),
        thread_ts: Some(parent_ts.to_string()),
        reactions: vec![],
    }
}

pub fn channel(channel_id: &str, tag_id: Option<i64>) -> ChannelConfig {
    ChannelConfig {
        channel_id: channel_id.to_string(),
        tag_id,
        force_import: false,
    }
}

pub fn import_settings(channels: Vec<ChannelConfig>) -> ImportSettings {
    ImportSettings {
        channels: ChannelTagMap::new(channels),
        archive_reaction: "archive".to_string(),
        fetch_timeout: Duration::from_secs(5),
        export_dir: PathBuf::from("./data/import_files"),
    }
}

pub fn import_service(
    pool: &DbPool,
    source: Arc<FakeChatSource>,
    channels: Vec<ChannelConfig>,
) -> ImportService {
    ImportService::new(pool.clone(), source, import_settings(channels))
}

// ============================================================================
// HTTP
// ============================================================================

pub fn build_test_state(pool: DbPool, source: Arc<FakeChatSource>, channels: Vec<ChannelConfig>) -> AppState {
    AppState::from_parts(pool, source, import_settings(channels))
}

pub fn build_test_app(state: AppState) -> axum::Router {
    memo_archive::app(state, Duration::from_secs(30))
}
