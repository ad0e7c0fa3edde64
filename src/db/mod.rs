//! Database layer for the memo archive.
//!
//! Provides SQLite connection pooling and query modules
//! for all archived entities.

mod comments;
mod memo_query;
mod memos;
mod pool;
mod posters;
mod tags;

pub use comments::*;
pub use memo_query::*;
pub use memos::*;
pub use pool::*;
pub use posters::*;
pub use tags::*;

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Type alias for the SQLite connection pool.
pub type DbPool = sqlx::SqlitePool;

/// Type alias for a transaction on the pool.
pub type DbTransaction<'a> = sqlx::Transaction<'a, sqlx::Sqlite>;

const IN_MEMORY: &str = ":memory:";

/// Initialize the database connection pool.
///
/// Creates parent directories if needed and configures SQLite with
/// WAL journaling and foreign keys. An in-memory database lives inside a
/// single connection, so that pool is pinned to exactly one connection
/// that is never recycled.
pub async fn init_pool(path: &str) -> Result<DbPool> {
    let in_memory = path == IN_MEMORY;

    if !in_memory {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(path)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30))
        .foreign_keys(true)
        .pragma("temp_store", "memory");

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(10)
            .min_connections(1)
    };

    let pool = pool_options
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    info!("Database pool initialized: {}", path);

    Ok(pool)
}

/// Initialize the database schema.
///
/// Applies the complete schema from schema.sql. Uses IF NOT EXISTS
/// clauses so it's safe to run multiple times.
pub async fn initialize_schema(pool: &DbPool) -> Result<()> {
    let schema = include_str!("../../schema.sql");

    info!("Initializing database schema");

    for statement in split_statements(schema) {
        sqlx::query(&statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully");

    Ok(())
}

/// Split a SQL script into statements.
///
/// Comment lines are dropped before splitting so a `;` inside a comment
/// never ends a statement.
fn split_statements(script: &str) -> Vec<String> {
    let sql: String = script
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(String::from)
        .collect()
}

/// Build `?, ?, ?` for an `IN (...)` clause.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
