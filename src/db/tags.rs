//! Tag database queries.
//!
//! Tags are listed by priority; names are unique.

use crate::error::{unique_violation, FieldError};
use crate::models::{Tag, TagSummary, TAG_NAME_MAX_LEN};
use crate::{Error, Result};

use super::{placeholders, DbPool};

// ============================================================================
// Types
// ============================================================================

/// Input for creating a tag.
#[derive(Debug, Clone)]
pub struct CreateTag {
    pub name: String,
    pub priority: i64,
}

/// Input for updating a tag.
#[derive(Debug, Clone, Default)]
pub struct UpdateTag {
    pub name: Option<String>,
    pub priority: Option<i64>,
}

fn validate_name(name: &str, errors: &mut Vec<FieldError>) {
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "can't be blank"));
    } else if name.chars().count() > TAG_NAME_MAX_LEN {
        errors.push(FieldError::new(
            "name",
            format!("is too long (maximum is {} characters)", TAG_NAME_MAX_LEN),
        ));
    }
}

impl CreateTag {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        validate_name(&self.name, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }
}

impl UpdateTag {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            validate_name(name, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// List all tags in display order.
/// Uses idx_tags_priority index.
pub async fn list_tags(pool: &DbPool) -> Result<Vec<Tag>> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY priority ASC, id ASC")
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

/// Get a tag by ID.
pub async fn get_tag(pool: &DbPool, id: i64) -> Result<Tag> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Tag not found: {}", id)))
}

/// Create a new tag.
pub async fn create_tag(pool: &DbPool, input: CreateTag) -> Result<Tag> {
    input.validate()?;

    let name = input.name.trim().to_string();
    sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (name, priority)
        VALUES (?, ?)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(input.priority)
    .fetch_one(pool)
    .await
    .map_err(|e| unique_violation(e, "name"))
}

/// Update a tag.
pub async fn update_tag(pool: &DbPool, id: i64, input: UpdateTag) -> Result<Tag> {
    input.validate()?;

    let name = input.name.map(|n| n.trim().to_string());
    sqlx::query_as::<_, Tag>(
        r#"
        UPDATE tags SET
            name = COALESCE(?, name),
            priority = COALESCE(?, priority),
            updated_at = datetime('now')
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(input.priority)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| unique_violation(e, "name"))?
    .ok_or_else(|| Error::NotFound(format!("Tag not found: {}", id)))
}

/// Delete a tag. Memo links to it are removed by cascade.
pub async fn delete_tag(pool: &DbPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Tag not found: {}", id)));
    }

    Ok(())
}

/// Return the ids from `ids` that have no tag row.
pub async fn missing_tag_ids(pool: &DbPool, ids: &[i64]) -> Result<Vec<i64>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!("SELECT id FROM tags WHERE id IN ({})", placeholders(ids.len()));
    let mut q = sqlx::query_as::<_, (i64,)>(&query);
    for id in ids {
        q = q.bind(id);
    }
    let found: Vec<i64> = q.fetch_all(pool).await?.into_iter().map(|(id,)| id).collect();

    let mut missing: Vec<i64> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
    missing.sort_unstable();
    missing.dedup();
    Ok(missing)
}

/// Tags attached to each of the given memos, keyed by memo id.
pub async fn tags_for_memos(
    pool: &DbPool,
    memo_ids: &[i64],
) -> Result<std::collections::HashMap<i64, Vec<TagSummary>>> {
    let mut by_memo: std::collections::HashMap<i64, Vec<TagSummary>> =
        std::collections::HashMap::new();
    if memo_ids.is_empty() {
        return Ok(by_memo);
    }

    let query = format!(
        r#"
        SELECT mt.memo_id, t.id, t.name
        FROM memo_tags mt
        JOIN tags t ON t.id = mt.tag_id
        WHERE mt.memo_id IN ({})
        ORDER BY t.priority ASC, t.id ASC
        "#,
        placeholders(memo_ids.len())
    );
    let mut q = sqlx::query_as::<_, (i64, i64, String)>(&query);
    for id in memo_ids {
        q = q.bind(id);
    }

    for (memo_id, id, name) in q.fetch_all(pool).await? {
        by_memo
            .entry(memo_id)
            .or_default()
            .push(TagSummary { id, name });
    }

    Ok(by_memo)
}
