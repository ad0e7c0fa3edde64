//! Poster database queries.
//!
//! Posters cache chat user identities so memos can show a display name.

use std::collections::HashMap;

use crate::models::{Poster, PosterInput};
use crate::Result;

use super::DbPool;

/// Insert or refresh posters keyed by `user_key`.
///
/// Returns the number of posters written.
pub async fn upsert_posters(pool: &DbPool, posters: &[PosterInput]) -> Result<usize> {
    if posters.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for poster in posters {
        sqlx::query(
            r#"
            INSERT INTO posters (user_key, display_name, real_name)
            VALUES (?, ?, ?)
            ON CONFLICT(user_key) DO UPDATE SET
                display_name = excluded.display_name,
                real_name = excluded.real_name,
                updated_at = datetime('now')
            "#,
        )
        .bind(&poster.user_key)
        .bind(&poster.display_name)
        .bind(&poster.real_name)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(posters.len())
}

pub async fn list_posters(pool: &DbPool) -> Result<Vec<Poster>> {
    let posters = sqlx::query_as::<_, Poster>("SELECT * FROM posters ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(posters)
}

/// Map of user key to display name, for posters that have one.
pub async fn poster_name_map(pool: &DbPool) -> Result<HashMap<String, String>> {
    let rows: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT user_key, display_name FROM posters")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(key, name)| name.map(|n| (key, n)))
        .collect())
}

pub async fn count_posters(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posters")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
