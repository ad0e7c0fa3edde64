//! Chat API client.
//!
//! Reads channel history, thread replies and the member list from the
//! Slack Web API. Every response is an envelope with an `ok` flag; list
//! endpoints are paged with `response_metadata.next_cursor`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::config::SlackConfig;
use crate::error::{Error, Result};
use crate::models::{MembersBody, MessagesBody, SlackEnvelope, SlackMember, SlackMessage};

/// Items requested per page.
const PAGE_LIMIT: u32 = 200;

/// Source of chat messages and members.
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Top-level messages of a channel.
    async fn channel_history(&self, channel_id: &str) -> Result<Vec<SlackMessage>>;

    /// All messages of a thread, including the root.
    async fn thread_replies(&self, channel_id: &str, thread_ts: &str) -> Result<Vec<SlackMessage>>;

    /// Workspace members.
    async fn users(&self) -> Result<Vec<SlackMember>>;
}

/// Slack Web API client.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    max_pages: usize,
}

impl SlackClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        max_pages: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("MemoArchive/1.0")
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            max_pages: max_pages.max(1),
        })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.api_token.clone(),
            config.max_pages,
            config.fetch_timeout,
        )
    }

    fn token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| Error::Config("SLACK_API_TOKEN is not set".to_string()))
    }

    /// Call one API method and unwrap its envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<SlackEnvelope<T>> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token()?))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(method, error = %e, "Chat API request failed");
                Error::ChatApi(format!("Request to {} failed: {}", method, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(method, %status, body = %text, "Chat API returned an error status");
            return Err(Error::ChatApi(format!("HTTP {} from {}", status, method)));
        }

        let envelope: SlackEnvelope<T> = response.json().await.map_err(|e| {
            error!(method, error = %e, "Chat API response could not be parsed");
            Error::ChatApi(format!("Failed to parse {} response: {}", method, e))
        })?;

        if !envelope.ok {
            let reason = envelope
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            error!(method, reason = %reason, "Chat API call was not ok");
            return Err(Error::ChatApi(format!("{}: {}", method, reason)));
        }

        Ok(envelope)
    }

    /// Follow cursors until exhausted or `max_pages` pages have been read.
    async fn call_paged<T, I>(
        &self,
        method: &str,
        query: Vec<(&str, String)>,
        items: impl Fn(T) -> Vec<I>,
    ) -> Result<Vec<I>>
    where
        T: DeserializeOwned,
    {
        let mut collected = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=self.max_pages {
            let mut page_query = query.clone();
            page_query.push(("limit", PAGE_LIMIT.to_string()));
            if let Some(c) = &cursor {
                page_query.push(("cursor", c.clone()));
            }

            let envelope = self.call::<T>(method, &page_query).await?;
            cursor = envelope
                .response_metadata
                .as_ref()
                .and_then(|m| m.cursor())
                .map(String::from);
            collected.extend(items(envelope.body));

            debug!(method, page, total = collected.len(), "Fetched chat API page");

            if cursor.is_none() {
                return Ok(collected);
            }
        }

        warn!(
            method,
            max_pages = self.max_pages,
            "Stopped following cursor at page limit"
        );
        Ok(collected)
    }
}

#[async_trait]
impl ChatSource for SlackClient {
    async fn channel_history(&self, channel_id: &str) -> Result<Vec<SlackMessage>> {
        self.call_paged(
            "conversations.history",
            vec![("channel", channel_id.to_string())],
            |body: MessagesBody| body.messages,
        )
        .await
    }

    async fn thread_replies(&self, channel_id: &str, thread_ts: &str) -> Result<Vec<SlackMessage>> {
        self.call_paged(
            "conversations.replies",
            vec![
                ("channel", channel_id.to_string()),
                ("ts", thread_ts.to_string()),
            ],
            |body: MessagesBody| body.messages,
        )
        .await
    }

    async fn users(&self) -> Result<Vec<SlackMember>> {
        self.call_paged("users.list", Vec::new(), |body: MembersBody| body.members)
            .await
    }
}
