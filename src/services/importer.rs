//! Chat import.
//!
//! Collects reaction-marked posts from the configured channels and
//! reconciles them into memos, memo tags and comments. Every row is keyed
//! by its chat timestamp, so running an import twice leaves the archive
//! unchanged apart from refreshed content.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{ChannelConfig, ChannelTagMap, SlackConfig};
use crate::db::{placeholders, poster_name_map, upsert_posters, DbPool, DbTransaction};
use crate::error::{Error, Result};
use crate::models::{archive_title, ArchivePost, PosterInput, ThreadReply, COMMENT_MAX_LEN};

use super::export::{read_export_dir, ExportSource};
use super::ChatSource;

static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<@([A-Z0-9]+)>").unwrap()
});

/// Import behaviour taken from configuration.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub channels: ChannelTagMap,
    /// Posts with a reaction whose name contains this are archived.
    pub archive_reaction: String,
    /// Upper bound on one external fetch.
    pub fetch_timeout: Duration,
    /// Where exported channel history files are read from.
    pub export_dir: PathBuf,
}

impl ImportSettings {
    pub fn from_config(config: &SlackConfig) -> Self {
        Self {
            channels: config.channels.clone(),
            archive_reaction: config.archive_reaction.clone(),
            fetch_timeout: config.fetch_timeout,
            export_dir: config.export_dir.clone(),
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Posts selected for archiving.
    pub posts: usize,
    /// Memos inserted or refreshed.
    pub memos: usize,
    /// Memo-tag links newly created.
    pub memo_tags: usize,
    /// Comments inserted or refreshed.
    pub comments: usize,
}

/// Imports chat posts into the archive.
#[derive(Clone)]
pub struct ImportService {
    pool: DbPool,
    source: Arc<dyn ChatSource>,
    settings: ImportSettings,
}

/// Replace `<@USERKEY>` mentions with `@display_name` when the poster is known.
pub fn rewrite_mentions(text: &str, names: &HashMap<String, String>) -> String {
    MENTION
        .replace_all(text, |caps: &Captures| match names.get(&caps[1]) {
            Some(name) => format!("@{}", name),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

impl ImportService {
    pub fn new(pool: DbPool, source: Arc<dyn ChatSource>, settings: ImportSettings) -> Self {
        Self {
            pool,
            source,
            settings,
        }
    }

    async fn with_timeout<T>(
        &self,
        what: impl Into<String>,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.settings.fetch_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let what = what.into();
                error!(
                    timeout_ms = self.settings.fetch_timeout.as_millis() as u64,
                    "Timed out fetching {}", what
                );
                Err(Error::Timeout(what))
            }
        }
    }

    /// Fetch every configured channel and keep the posts to archive.
    ///
    /// Fails on the first channel that errors or times out; nothing has been
    /// written at that point.
    pub async fn collect_posts(&self) -> Result<Vec<ArchivePost>> {
        let mut posts = Vec::new();

        for channel in self.settings.channels.channels() {
            let messages = self
                .with_timeout(
                    format!("history of channel {}", channel.channel_id),
                    self.source.channel_history(&channel.channel_id),
                )
                .await?;

            let fetched = messages.len();
            let before = posts.len();
            for message in messages {
                if !channel.force_import && !message.has_reaction(&self.settings.archive_reaction) {
                    continue;
                }
                if message.text.trim().is_empty() {
                    warn!(channel = %channel.channel_id, ts = %message.ts, "Skipping post without text");
                    continue;
                }
                posts.push(ArchivePost::from_message(
                    message,
                    &channel.channel_id,
                    channel.tag_id,
                ));
            }

            debug!(
                channel = %channel.channel_id,
                fetched,
                selected = posts.len() - before,
                "Collected channel posts"
            );
        }

        Ok(posts)
    }

    /// Write posts, their tags and their thread replies in one transaction.
    ///
    /// Any failure rolls the whole batch back.
    pub async fn reconcile(&self, posts: Vec<ArchivePost>) -> Result<ImportReport> {
        // Read before the transaction holds the connection
        let names = poster_name_map(&self.pool).await?;

        let mut tx = self.pool.begin().await?;
        match self.reconcile_in(&mut tx, &posts, &names).await {
            Ok(report) => {
                tx.commit().await?;
                info!(
                    posts = report.posts,
                    memos = report.memos,
                    memo_tags = report.memo_tags,
                    comments = report.comments,
                    "Import committed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Import failed, rolling back");
                Err(e)
            }
        }
    }

    async fn reconcile_in(
        &self,
        tx: &mut DbTransaction<'_>,
        posts: &[ArchivePost],
        names: &HashMap<String, String>,
    ) -> Result<ImportReport> {
        let mut report = ImportReport {
            posts: posts.len(),
            ..Default::default()
        };
        if posts.is_empty() {
            return Ok(report);
        }

        for key in posts.iter().filter_map(|p| p.poster_user_key.as_deref()) {
            ensure_poster(tx, key).await?;
        }

        for post in posts {
            let content = rewrite_mentions(&post.text, names);
            sqlx::query(
                r#"
                INSERT INTO memos (title, content, slack_ts, poster_user_key)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(slack_ts) DO UPDATE SET
                    title = excluded.title,
                    content = excluded.content,
                    updated_at = datetime('now')
                "#,
            )
            .bind(archive_title(&content))
            .bind(&content)
            .bind(&post.ts)
            .bind(&post.poster_user_key)
            .execute(&mut **tx)
            .await?;
            report.memos += 1;
        }

        let memo_ids = memo_ids_by_ts(tx, posts).await?;

        for post in posts {
            let Some(tag_id) = post.tag_id else {
                debug!(ts = %post.ts, channel = %post.channel_id, "Channel has no tag, skipping link");
                continue;
            };
            let Some(memo_id) = memo_ids.get(&post.ts) else {
                continue;
            };
            let result = sqlx::query(
                r#"
                INSERT INTO memo_tags (memo_id, tag_id)
                VALUES (?, ?)
                ON CONFLICT(memo_id, tag_id) DO NOTHING
                "#,
            )
            .bind(memo_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
            report.memo_tags += result.rows_affected() as usize;
        }

        for post in posts {
            let (Some(thread_ts), Some(memo_id)) = (&post.thread_ts, memo_ids.get(&post.ts))
            else {
                continue;
            };
            report.comments += self
                .import_thread(tx, *memo_id, &post.channel_id, thread_ts, names)
                .await?;
        }

        Ok(report)
    }

    async fn import_thread(
        &self,
        tx: &mut DbTransaction<'_>,
        memo_id: i64,
        channel_id: &str,
        thread_ts: &str,
        names: &HashMap<String, String>,
    ) -> Result<usize> {
        let messages = self
            .with_timeout(
                format!("replies of thread {} in {}", thread_ts, channel_id),
                self.source.thread_replies(channel_id, thread_ts),
            )
            .await?;

        let mut written = 0;
        for reply in messages
            .into_iter()
            .filter_map(|m| ThreadReply::from_message(m, thread_ts))
        {
            if reply.text.trim().is_empty() {
                continue;
            }

            let mut content = rewrite_mentions(&reply.text, names);
            if content.chars().count() > COMMENT_MAX_LEN {
                warn!(ts = %reply.ts, "Truncating long thread reply");
                content = truncate_chars(&content, COMMENT_MAX_LEN);
            }

            if let Some(key) = reply.poster_user_key.as_deref() {
                ensure_poster(tx, key).await?;
            }

            sqlx::query(
                r#"
                INSERT INTO comments (memo_id, content, poster_user_key, slack_parent_ts, slack_ts)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(slack_ts) DO UPDATE SET
                    content = excluded.content,
                    updated_at = datetime('now')
                "#,
            )
            .bind(memo_id)
            .bind(&content)
            .bind(&reply.poster_user_key)
            .bind(&reply.parent_ts)
            .bind(&reply.ts)
            .execute(&mut **tx)
            .await?;
            written += 1;
        }

        Ok(written)
    }

    /// Collect and reconcile in one go.
    pub async fn run(&self) -> Result<ImportReport> {
        if self.settings.channels.is_empty() {
            return Err(Error::Config(
                "No channels configured; set SLACK_CHANNELS".to_string(),
            ));
        }

        let posts = self.collect_posts().await?;
        self.reconcile(posts).await
    }

    /// Import the exported history files of `channel_id` from the
    /// configured export directory.
    pub async fn run_export(&self, channel_id: &str) -> Result<ImportReport> {
        self.import_export_dir(&self.settings.export_dir, channel_id)
            .await
    }

    /// Import every `*.json` history file in `dir` as posts of `channel_id`.
    ///
    /// Files go through the same selection and reconciliation as a live
    /// import, and all of them are written in a single transaction. The
    /// channel's tag and `force_import` flag come from the channel map; an
    /// unmapped channel gets no tag.
    pub async fn import_export_dir(&self, dir: &Path, channel_id: &str) -> Result<ImportReport> {
        let messages = read_export_dir(dir).await?;
        info!(
            dir = %dir.display(),
            channel = channel_id,
            messages = messages.len(),
            "Importing exported history"
        );

        let channel = self
            .settings
            .channels
            .find(channel_id)
            .cloned()
            .unwrap_or_else(|| ChannelConfig {
                channel_id: channel_id.to_string(),
                tag_id: None,
                force_import: false,
            });

        let files = ImportService {
            pool: self.pool.clone(),
            source: Arc::new(ExportSource::new(messages)),
            settings: ImportSettings {
                channels: ChannelTagMap::new(vec![channel]),
                ..self.settings.clone()
            },
        };

        let posts = files.collect_posts().await?;
        files.reconcile(posts).await
    }

    /// Refresh poster names from the member list.
    pub async fn sync_posters(&self) -> Result<usize> {
        let members = self
            .with_timeout("member list", self.source.users())
            .await?;

        let posters: Vec<PosterInput> = members.iter().filter_map(PosterInput::from_member).collect();
        let skipped = members.len() - posters.len();
        if skipped > 0 {
            debug!(skipped, "Skipped members without an id");
        }

        let written = upsert_posters(&self.pool, &posters).await?;
        info!(posters = written, "Posters synced");
        Ok(written)
    }
}

/// Insert a bare poster row so the foreign key holds before names are synced.
async fn ensure_poster(tx: &mut DbTransaction<'_>, user_key: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO posters (user_key)
        VALUES (?)
        ON CONFLICT(user_key) DO NOTHING
        "#,
    )
    .bind(user_key)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn memo_ids_by_ts(
    tx: &mut DbTransaction<'_>,
    posts: &[ArchivePost],
) -> Result<HashMap<String, i64>> {
    let mut ids = HashMap::new();

    // Stay well below SQLite's bound-parameter limit
    for chunk in posts.chunks(500) {
        let query = format!(
            "SELECT slack_ts, id FROM memos WHERE slack_ts IN ({})",
            placeholders(chunk.len())
        );
        let mut q = sqlx::query_as::<_, (String, i64)>(&query);
        for post in chunk {
            q = q.bind(&post.ts);
        }
        ids.extend(q.fetch_all(&mut **tx).await?);
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_comments, count_memo_tags, count_memos, init_pool, initialize_schema};
    use crate::models::{SlackMember, SlackMessage, SlackProfile, SlackReaction};
    use async_trait::async_trait;

    #[derive(Default)]
    struct FakeSource {
        history: HashMap<String, Vec<SlackMessage>>,
        replies: HashMap<String, Vec<SlackMessage>>,
        members: Vec<SlackMember>,
    }

    #[async_trait]
    impl ChatSource for FakeSource {
        async fn channel_history(&self, channel_id: &str) -> Result<Vec<SlackMessage>> {
            self.history
                .get(channel_id)
                .cloned()
                .ok_or_else(|| Error::ChatApi("channel_not_found".into()))
        }

        async fn thread_replies(&self, _channel_id: &str, thread_ts: &str) -> Result<Vec<SlackMessage>> {
            self.replies
                .get(thread_ts)
                .cloned()
                .ok_or_else(|| Error::ChatApi("thread_not_found".into()))
        }

        async fn users(&self) -> Result<Vec<SlackMember>> {
            Ok(self.members.clone())
        }
    }

    fn message(ts: &str, text: &str, reaction: Option<&str>) -> SlackMessage {
        SlackMessage {
            text: text.into(),
            user: Some("U1".into()),
            ts: ts.into(),
            thread_ts: None,
            reactions: reaction
                .map(|name| {
                    vec![SlackReaction {
                        name: name.into(),
                        count: 1,
                    }]
                })
                .unwrap_or_default(),
        }
    }

    fn settings(channels: Vec<ChannelConfig>) -> ImportSettings {
        ImportSettings {
            channels: ChannelTagMap::new(channels),
            archive_reaction: "archive".into(),
            fetch_timeout: Duration::from_secs(5),
            export_dir: PathBuf::from("./data/import_files"),
        }
    }

    fn channel(id: &str, tag_id: Option<i64>, force_import: bool) -> ChannelConfig {
        ChannelConfig {
            channel_id: id.into(),
            tag_id,
            force_import,
        }
    }

    async fn setup() -> DbPool {
        let pool = init_pool(":memory:").await.unwrap();
        initialize_schema(&pool).await.unwrap();
        pool
    }

    #[test]
    fn test_rewrite_mentions() {
        let names = HashMap::from([("U1".to_string(), "alice".to_string())]);
        assert_eq!(
            rewrite_mentions("hi <@U1> and <@U9>", &names),
            "hi @alice and <@U9>"
        );
        assert_eq!(rewrite_mentions("no mentions", &names), "no mentions");
    }

    #[tokio::test]
    async fn test_collect_filters_by_reaction() {
        let pool = setup().await;
        let source = FakeSource {
            history: HashMap::from([
                (
                    "C1".to_string(),
                    vec![
                        message("1.0", "keep me", Some("archive")),
                        message("2.0", "skip me", Some("thumbsup")),
                        message("3.0", "also keep", Some("archive_later")),
                        message("4.0", "   ", Some("archive")),
                    ],
                ),
                ("C2".to_string(), vec![message("5.0", "forced", None)]),
            ]),
            ..Default::default()
        };
        let service = ImportService::new(
            pool,
            Arc::new(source),
            settings(vec![channel("C1", Some(1), false), channel("C2", None, true)]),
        );

        let posts = service.collect_posts().await.unwrap();
        let ts: Vec<&str> = posts.iter().map(|p| p.ts.as_str()).collect();
        assert_eq!(ts, vec!["1.0", "3.0", "5.0"]);
        assert_eq!(posts[0].tag_id, Some(1));
        assert_eq!(posts[2].tag_id, None);
        assert_eq!(posts[2].channel_id, "C2");
    }

    #[tokio::test]
    async fn test_collect_fails_on_any_channel() {
        let pool = setup().await;
        let source = FakeSource {
            history: HashMap::from([("C1".to_string(), vec![])]),
            ..Default::default()
        };
        let service = ImportService::new(
            pool,
            Arc::new(source),
            settings(vec![channel("C1", None, false), channel("C2", None, false)]),
        );

        assert!(matches!(service.collect_posts().await, Err(Error::ChatApi(_))));
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let pool = setup().await;
        sqlx::query("INSERT INTO tags (name) VALUES ('rust')")
            .execute(&pool)
            .await
            .unwrap();

        let mut root = message("10.0", "thread root text", Some("archive"));
        root.thread_ts = Some("10.0".into());
        let mut reply = message("11.0", "a reply", None);
        reply.thread_ts = Some("10.0".into());

        let source = FakeSource {
            history: HashMap::from([("C1".to_string(), vec![root.clone()])]),
            replies: HashMap::from([("10.0".to_string(), vec![root, reply])]),
            ..Default::default()
        };
        let service = ImportService::new(
            pool.clone(),
            Arc::new(source),
            settings(vec![channel("C1", Some(1), false)]),
        );

        let first = service.run().await.unwrap();
        assert_eq!(
            first,
            ImportReport {
                posts: 1,
                memos: 1,
                memo_tags: 1,
                comments: 1,
            }
        );

        let second = service.run().await.unwrap();
        assert_eq!(second.memo_tags, 0);

        assert_eq!(count_memos(&pool).await.unwrap(), 1);
        assert_eq!(count_memo_tags(&pool).await.unwrap(), 1);
        assert_eq!(count_comments(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_thread_failure_rolls_back() {
        let pool = setup().await;
        let mut root = message("20.0", "threaded", Some("archive"));
        root.thread_ts = Some("20.0".into());

        let source = FakeSource {
            history: HashMap::from([(
                "C1".to_string(),
                vec![message("19.0", "plain", Some("archive")), root],
            )]),
            ..Default::default()
        };
        let service = ImportService::new(
            pool.clone(),
            Arc::new(source),
            settings(vec![channel("C1", None, false)]),
        );

        assert!(service.run().await.is_err());
        assert_eq!(count_memos(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sync_posters_defaults_names() {
        let pool = setup().await;
        let source = FakeSource {
            members: vec![
                SlackMember {
                    id: Some("U1".into()),
                    real_name: Some("Alice A".into()),
                    profile: Some(SlackProfile {
                        display_name: Some("alice".into()),
                    }),
                },
                SlackMember {
                    id: Some("U2".into()),
                    real_name: None,
                    profile: None,
                },
                SlackMember::default(),
            ],
            ..Default::default()
        };
        let service = ImportService::new(pool.clone(), Arc::new(source), settings(vec![]));

        assert_eq!(service.sync_posters().await.unwrap(), 2);
        let names = poster_name_map(&pool).await.unwrap();
        assert_eq!(names["U1"], "alice");
        assert_eq!(names["U2"], crate::models::UNKNOWN_POSTER_NAME);
    }

    #[tokio::test]
    async fn test_mentions_rewritten_on_import() {
        let pool = setup().await;
        upsert_posters(
            &pool,
            &[PosterInput {
                user_key: "U7".into(),
                display_name: "bob".into(),
                real_name: "Bob".into(),
            }],
        )
        .await
        .unwrap();

        let source = FakeSource {
            history: HashMap::from([(
                "C1".to_string(),
                vec![message("30.0", "ping <@U7> please", Some("archive"))],
            )]),
            ..Default::default()
        };
        let service = ImportService::new(
            pool.clone(),
            Arc::new(source),
            settings(vec![channel("C1", None, false)]),
        );
        service.run().await.unwrap();

        let (content,): (String,) = sqlx::query_as("SELECT content FROM memos")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(content, "ping @bob please");
    }

    #[tokio::test]
    async fn test_run_without_channels_is_a_config_error() {
        let pool = setup().await;
        let service = ImportService::new(pool, Arc::new(FakeSource::default()), settings(vec![]));
        assert!(matches!(service.run().await, Err(Error::Config(_))));
    }
}
