//! Memo database queries.
//!
//! Memos are the primary archived entity. Creating or updating a memo and
//! its tag links happens in one transaction.

use crate::error::FieldError;
use crate::models::{Memo, MemoSummary};
use crate::{Error, Result};

use super::{missing_tag_ids, tags_for_memos, DbPool, DbTransaction};

// ============================================================================
// Types
// ============================================================================

/// Input for creating a memo directly (not through import).
#[derive(Debug, Clone, Default)]
pub struct CreateMemo {
    pub title: String,
    pub content: String,
    pub tag_ids: Vec<i64>,
}

/// Input for updating a memo. The title is fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct UpdateMemo {
    pub content: String,
    /// Replaces the memo's tags when present.
    pub tag_ids: Option<Vec<i64>>,
}

impl CreateMemo {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "can't be blank"));
        }
        if self.content.trim().is_empty() {
            errors.push(FieldError::new("content", "can't be blank"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }
}

impl UpdateMemo {
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(Error::field("content", "can't be blank"));
        }
        Ok(())
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT m.id, m.title, m.content, m.slack_ts, m.poster_user_key,
           p.display_name AS poster_display_name,
           m.created_at, m.updated_at
    FROM memos m
    LEFT JOIN posters p ON p.user_key = m.poster_user_key
"#;

// ============================================================================
// Queries
// ============================================================================

async fn ensure_tags_exist(pool: &DbPool, tag_ids: &[i64]) -> Result<()> {
    let missing = missing_tag_ids(pool, tag_ids).await?;
    if !missing.is_empty() {
        let ids: Vec<String> = missing.iter().map(i64::to_string).collect();
        return Err(Error::field(
            "tag_ids",
            format!("contains unknown tags: {}", ids.join(", ")),
        ));
    }
    Ok(())
}

async fn link_tags(tx: &mut DbTransaction<'_>, memo_id: i64, tag_ids: &[i64]) -> Result<()> {
    for tag_id in tag_ids {
        sqlx::query(
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
    }
    Ok(())
}

/// Create a memo and link its tags.
pub async fn create_memo(pool: &DbPool, input: CreateMemo) -> Result<Memo> {
    input.validate()?;
    ensure_tags_exist(pool, &input.tag_ids).await?;

    let mut tx = pool.begin().await?;

    let memo = sqlx::query_as::<_, Memo>(
        r#"
        INSERT INTO memos (title, content)
        VALUES (?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .fetch_one(&mut *tx)
    .await?;

    link_tags(&mut tx, memo.id, &input.tag_ids).await?;
    tx.commit().await?;

    Ok(memo)
}

/// Get a memo by ID.
pub async fn get_memo(pool: &DbPool, id: i64) -> Result<Memo> {
    sqlx::query_as::<_, Memo>("SELECT * FROM memos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Memo not found: {}", id)))
}

/// Get a memo with its poster name and tags.
pub async fn get_memo_summary(pool: &DbPool, id: i64) -> Result<MemoSummary> {
    let query = format!("{} WHERE m.id = ?", SUMMARY_SELECT);
    let mut memo = sqlx::query_as::<_, MemoSummary>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Memo not found: {}", id)))?;

    memo.tags = tags_for_memos(pool, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();

    Ok(memo)
}

/// Get a memo by the timestamp of the post it was imported from.
pub async fn get_memo_by_slack_ts(pool: &DbPool, slack_ts: &str) -> Result<Option<Memo>> {
    sqlx::query_as::<_, Memo>("SELECT * FROM memos WHERE slack_ts = ?")
        .bind(slack_ts)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

/// Update a memo's content and, when given, replace its tags.
pub async fn update_memo(pool: &DbPool, id: i64, input: UpdateMemo) -> Result<Memo> {
    input.validate()?;
    if let Some(tag_ids) = &input.tag_ids {
        ensure_tags_exist(pool, tag_ids).await?;
    }

    let mut tx = pool.begin().await?;

    let memo = sqlx::query_as::<_, Memo>(
        r#"
        UPDATE memos SET
            content = ?,
            updated_at = datetime('now')
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&input.content)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Memo not found: {}", id)))?;

    if let Some(tag_ids) = &input.tag_ids {
        sqlx::query("DELETE FROM memo_tags WHERE memo_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_tags(&mut tx, id, tag_ids).await?;
    }

    tx.commit().await?;

    Ok(memo)
}

/// Delete a memo. Comments and tag links are removed by cascade.
pub async fn delete_memo(pool: &DbPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM memos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Memo not found: {}", id)));
    }

    Ok(())
}

/// Count all memos.
pub async fn count_memos(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memos")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Count all memo-tag links.
pub async fn count_memo_tags(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memo_tags")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub(crate) fn summary_select() -> &'static str {
    SUMMARY_SELECT
}
