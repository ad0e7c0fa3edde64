//! Service layer for the memo archive.
//!
//! Contains external integrations and the import workflow:
//! - Slack (chat API client behind the `ChatSource` trait)
//! - Importer (reaction-marked posts → memos, tags and comments)
//! - Export (channel history files read from disk)

mod export;
mod importer;
mod slack;

pub use importer::{rewrite_mentions, ImportReport, ImportService, ImportSettings};
pub use export::ExportSource;
pub use slack::{ChatSource, SlackClient};
