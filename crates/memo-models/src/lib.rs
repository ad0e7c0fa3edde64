//! Data models for the memo archive.
//!
//! Defines the records stored in the archive (memos, tags, comments,
//! posters) and the payloads exchanged with the chat API.
//!
//! This crate can be used with or without sqlx support:
//! - Default: No database dependencies, pure data structures
//! - With `sqlx` feature: Adds `FromRow` derive for database mapping

mod comment;
mod memo;
mod poster;
mod slack;
mod tag;

pub use comment::*;
pub use memo::*;
pub use poster::*;
pub use slack::*;
pub use tag::*;
