//! API Routes for the memo archive
//!
//! This module combines all API routes into a single router.

mod comments;
mod memos;
mod slack;
pub mod status;
mod tags;

use axum::Router;

use crate::AppState;

/// Build the complete API router.
///
/// Route structure:
/// - /memos/* - Memo listing, CRUD and comments
/// - /tags/* - Tag CRUD
/// - /slack/* - Chat import and poster sync
/// - /health* - Health checks
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(status::routes())
        .nest("/memos", memos::routes().merge(comments::routes()))
        .nest("/tags", tags::routes())
        .nest("/slack", slack::routes())
}

/// Split a comma-separated id list such as `1,2, 3`.
pub(crate) fn parse_id_list(field: &str, raw: &str) -> crate::Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                crate::Error::InvalidInput(format!("{} must be integers, got '{}'", field, s))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", vec![])]
    #[case("1", vec![1])]
    #[case("1, 2,3", vec![1, 2, 3])]
    #[case("4,,5,", vec![4, 5])]
    fn test_parse_id_list(#[case] raw: &str, #[case] expected: Vec<i64>) {
        assert_eq!(parse_id_list("tag_ids", raw).unwrap(), expected);
    }

    #[test]
    fn test_parse_id_list_rejects_text() {
        assert!(matches!(
            parse_id_list("tag_ids", "1,x"),
            Err(crate::Error::InvalidInput(_))
        ));
    }
}
