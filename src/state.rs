//! Application state for the memo archive.
//!
//! Contains the shared state that is passed to all handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;
use crate::services::{ChatSource, ImportService, ImportSettings, SlackClient};
use crate::Result;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DbPool,
    /// Chat import workflow.
    pub importer: ImportService,
}

impl AppState {
    /// Create the application state from the loaded configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::init_pool(&config.database.path).await?;
        crate::db::initialize_schema(&db).await?;

        if config.slack.api_token.is_none() {
            tracing::warn!("SLACK_API_TOKEN is not set; imports will fail until it is");
        }
        let source: Arc<dyn ChatSource> = Arc::new(SlackClient::from_config(&config.slack)?);
        let settings = ImportSettings::from_config(&config.slack);

        Ok(Self::from_parts(db, source, settings))
    }

    /// Assemble state from already constructed parts.
    pub fn from_parts(db: DbPool, source: Arc<dyn ChatSource>, settings: ImportSettings) -> Self {
        let importer = ImportService::new(db.clone(), source, settings);
        Self { db, importer }
    }
}
