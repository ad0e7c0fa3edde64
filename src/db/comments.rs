//! Comment database queries.

use crate::models::{Comment, COMMENT_MAX_LEN};
use crate::{Error, Result};

use super::{get_memo, DbPool};

/// Input for a comment written through the API.
#[derive(Debug, Clone, Default)]
pub struct CreateComment {
    pub content: String,
}

/// Validate comment content: required, at most [`COMMENT_MAX_LEN`] chars.
pub fn validate_comment_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::field("content", "can't be blank"));
    }
    if content.chars().count() > COMMENT_MAX_LEN {
        return Err(Error::field(
            "content",
            format!("is too long (maximum is {} characters)", COMMENT_MAX_LEN),
        ));
    }
    Ok(())
}

/// Add a comment to a memo.
pub async fn create_comment(pool: &DbPool, memo_id: i64, input: CreateComment) -> Result<Comment> {
    validate_comment_content(&input.content)?;
    get_memo(pool, memo_id).await?;

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (memo_id, content)
        VALUES (?, ?)
        RETURNING *
        "#,
    )
    .bind(memo_id)
    .bind(&input.content)
    .fetch_one(pool)
    .await?;

    Ok(comment)
}

/// Replace a comment's content. The comment must belong to `memo_id`.
pub async fn update_comment(
    pool: &DbPool,
    memo_id: i64,
    id: i64,
    content: &str,
) -> Result<Comment> {
    validate_comment_content(content)?;

    sqlx::query_as::<_, Comment>(
        r#"
        UPDATE comments SET
            content = ?,
            updated_at = datetime('now')
        WHERE id = ? AND memo_id = ?
        RETURNING *
        "#,
    )
    .bind(content)
    .bind(id)
    .bind(memo_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Comment not found: {}", id)))
}

/// Comments on a memo, newest first.
pub async fn list_memo_comments(pool: &DbPool, memo_id: i64) -> Result<Vec<Comment>> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT * FROM comments
        WHERE memo_id = ?
        ORDER BY id DESC
        "#,
    )
    .bind(memo_id)
    .fetch_all(pool)
    .await
    .map_err(Error::from)
}

pub async fn count_comments(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
