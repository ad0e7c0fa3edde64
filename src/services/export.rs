//! Exported channel history.
//!
//! A chat export stores a channel as JSON files, each holding the messages
//! of one day. Thread replies sit next to their root, linked by `thread_ts`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{MessagesBody, SlackMember, SlackMessage};

use super::ChatSource;

const BOM: char = '\u{feff}';

/// One export file: a bare message array, or an API-shaped `{"messages": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExportFile {
    Messages(Vec<SlackMessage>),
    Body(MessagesBody),
}

impl ExportFile {
    fn into_messages(self) -> Vec<SlackMessage> {
        match self {
            Self::Messages(messages) => messages,
            Self::Body(body) => body.messages,
        }
    }
}

/// Parse the contents of one export file.
pub(crate) fn parse_export(raw: &str, name: &str) -> Result<Vec<SlackMessage>> {
    serde_json::from_str::<ExportFile>(raw.trim_start_matches(BOM))
        .map(ExportFile::into_messages)
        .map_err(|e| Error::InvalidInput(format!("Invalid export file {}: {}", name, e)))
}

/// Read every `*.json` file in `dir`, in file name order.
pub(crate) async fn read_export_dir(dir: &Path) -> Result<Vec<SlackMessage>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        Error::InvalidInput(format!("Cannot read export directory {}: {}", dir.display(), e))
    })?;

    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut messages = Vec::new();
    for path in &files {
        let raw = tokio::fs::read_to_string(path).await?;
        let parsed = parse_export(&raw, &path.display().to_string())?;
        debug!(file = %path.display(), messages = parsed.len(), "Read export file");
        messages.extend(parsed);
    }

    Ok(messages)
}

/// Serves exported messages through the same interface as the live API.
pub struct ExportSource {
    messages: Vec<SlackMessage>,
}

impl ExportSource {
    pub fn new(messages: Vec<SlackMessage>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl ChatSource for ExportSource {
    /// Top-level posts: thread roots and unthreaded messages.
    async fn channel_history(&self, _channel_id: &str) -> Result<Vec<SlackMessage>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.thread_ts.as_deref().map_or(true, |root| root == m.ts))
            .cloned()
            .collect())
    }

    async fn thread_replies(&self, _channel_id: &str, thread_ts: &str) -> Result<Vec<SlackMessage>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.thread_ts.as_deref() == Some(thread_ts))
            .cloned()
            .collect())
    }

    async fn users(&self) -> Result<Vec<SlackMember>> {
        Ok(Vec::new())
    }
}
