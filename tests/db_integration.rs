//! Query pipeline and persistence tests against in-memory SQLite.

mod common;

use common::*;
use memo_archive::db::{self, MemoQueryParams, PAGE_SIZE};
use memo_archive::Error;
use rstest::rstest;

fn params() -> MemoQueryParams {
    MemoQueryParams::default()
}

fn titles(page: &db::MemoPage) -> Vec<&str> {
    page.memos.iter().map(|m| m.title.as_str()).collect()
}

// ============================================================================
// Filtering
// ============================================================================

async fn seed_three(pool: &db::DbPool) {
    create_test_memo(pool, "Test Title 1", "Test Content 1", &[]).await;
    create_test_memo(pool, "Test Title 2", "Test Content 2", &[]).await;
    create_test_memo(pool, "Other Title", "Other Content", &[]).await;
}

#[tokio::test]
async fn test_filter_by_title() {
    let pool = setup_test_db().await;
    seed_three(&pool).await;

    let page = db::query_memos(
        &pool,
        &MemoQueryParams {
            title: Some("Test".into()),
            order: Some("asc".into()),
            ..params()
        },
    )
    .await
    .unwrap();

    assert_eq!(titles(&page), vec!["Test Title 1", "Test Title 2"]);
}

#[tokio::test]
async fn test_filter_by_content() {
    let pool = setup_test_db().await;
    seed_three(&pool).await;

    let page = db::query_memos(
        &pool,
        &MemoQueryParams {
            content: Some("Content".into()),
            ..params()
        },
    )
    .await
    .unwrap();

    assert_eq!(page.memos.len(), 3);
}

#[tokio::test]
async fn test_filter_by_title_and_content() {
    let pool = setup_test_db().await;
    seed_three(&pool).await;

    let page = db::query_memos(
        &pool,
        &MemoQueryParams {
            title: Some("Other".into()),
            content: Some("Content".into()),
            ..params()
        },
    )
    .await
    .unwrap();

    assert_eq!(titles(&page), vec!["Other Title"]);
}

#[tokio::test]
async fn test_title_filter_is_case_sensitive() {
    let pool = setup_test_db().await;
    seed_three(&pool).await;

    let page = db::query_memos(
        &pool,
        &MemoQueryParams {
            title: Some("test".into()),
            ..params()
        },
    )
    .await
    .unwrap();

    assert!(page.memos.is_empty());
    assert_eq!(page.total_page, 1);
}

#[tokio::test]
async fn test_filter_by_any_tag_without_duplicates() {
    let pool = setup_test_db().await;
    let rust = create_test_tag(&pool, "rust", 0).await;
    let sql = create_test_tag(&pool, "sql", 1).await;
    let other = create_test_tag(&pool, "other", 2).await;

    create_test_memo(&pool, "both", "x", &[rust, sql]).await;
    create_test_memo(&pool, "rust only", "x", &[rust]).await;
    create_test_memo(&pool, "untagged", "x", &[]).await;
    create_test_memo(&pool, "other", "x", &[other]).await;

    let page = db::query_memos(
        &pool,
        &MemoQueryParams {
            tag_ids: vec![rust, sql],
            order: Some("asc".into()),
            ..params()
        },
    )
    .await
    .unwrap();

    assert_eq!(titles(&page), vec!["both", "rust only"]);
    let tag_names: Vec<&str> = page.memos[0].tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tag_names, vec!["rust", "sql"]);
}

// ============================================================================
// Ordering and paging
// ============================================================================

#[tokio::test]
async fn test_asc_and_desc_are_reversed() {
    let pool = setup_test_db().await;
    for i in 0..5 {
        create_test_memo(&pool, &format!("memo {}", i), "body", &[]).await;
    }

    let ids = |page: db::MemoPage| page.memos.into_iter().map(|m| m.id).collect::<Vec<_>>();

    let ordered = |order: &str| MemoQueryParams {
        order: Some(order.to_string()),
        ..params()
    };

    let asc = ids(db::query_memos(&pool, &ordered("asc")).await.unwrap());
    let desc = ids(db::query_memos(&pool, &ordered("desc")).await.unwrap());
    let default = ids(db::query_memos(&pool, &params()).await.unwrap());

    let mut reversed = asc.clone();
    reversed.reverse();
    assert_eq!(desc, reversed);
    assert_eq!(default, desc);
}

#[rstest]
#[case(0, 1)]
#[case(1, 1)]
#[case(10, 1)]
#[case(11, 2)]
#[case(25, 3)]
#[tokio::test]
async fn test_total_page(#[case] count: usize, #[case] expected: i64) {
    let pool = setup_test_db().await;
    for i in 0..count {
        create_test_memo(&pool, &format!("memo {}", i), "body", &[]).await;
    }

    let page = db::query_memos(&pool, &params()).await.unwrap();
    assert_eq!(page.total_page, expected);
}

#[tokio::test]
async fn test_pages_split_by_ten() {
    let pool = setup_test_db().await;
    let mut ids = Vec::new();
    for i in 0..25 {
        ids.push(create_test_memo(&pool, &format!("memo {}", i), "body", &[]).await);
    }

    let page_of = |page: Option<&str>| MemoQueryParams {
        order: Some("asc".into()),
        page: page.map(String::from),
        ..params()
    };

    let first = db::query_memos(&pool, &page_of(None)).await.unwrap();
    let clamped = db::query_memos(&pool, &page_of(Some("0"))).await.unwrap();
    let second = db::query_memos(&pool, &page_of(Some("2"))).await.unwrap();
    let third = db::query_memos(&pool, &page_of(Some("3"))).await.unwrap();

    let page_ids = |p: &db::MemoPage| p.memos.iter().map(|m| m.id).collect::<Vec<_>>();
    assert_eq!(page_ids(&first), ids[..10].to_vec());
    assert_eq!(page_ids(&clamped), page_ids(&first));
    assert_eq!(clamped.current_page, 1);
    assert_eq!(page_ids(&second), ids[10..20].to_vec());
    assert_eq!(second.current_page, 2);
    assert_eq!(third.memos.len(), 5);
    assert_eq!(first.memos.len() as i64, PAGE_SIZE);
}

#[tokio::test]
async fn test_non_integer_page_is_an_input_error() {
    let pool = setup_test_db().await;
    create_test_memo(&pool, "memo", "body", &[]).await;

    let result = db::query_memos(
        &pool,
        &MemoQueryParams {
            page: Some("a".into()),
            ..params()
        },
    )
    .await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_unknown_tag_is_a_validation_error() {
    let pool = setup_test_db().await;
    let result = db::create_memo(
        &pool,
        db::CreateMemo {
            title: "t".into(),
            content: "c".into(),
            tag_ids: vec![42],
        },
    )
    .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(db::count_memos(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_memo_cascades() {
    let pool = setup_test_db().await;
    let tag = create_test_tag(&pool, "rust", 0).await;
    let memo = create_test_memo(&pool, "t", "c", &[tag]).await;
    db::create_comment(&pool, memo, db::CreateComment { content: "hi".into() })
        .await
        .unwrap();

    db::delete_memo(&pool, memo).await.unwrap();

    assert_eq!(entity_counts(&pool).await, (0, 0, 0));
    assert_eq!(db::list_tags(&pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_memo_replaces_tags_only_when_given() {
    let pool = setup_test_db().await;
    let a = create_test_tag(&pool, "a", 0).await;
    let b = create_test_tag(&pool, "b", 1).await;
    let memo = create_test_memo(&pool, "title", "old", &[a]).await;

    db::update_memo(
        &pool,
        memo,
        db::UpdateMemo {
            content: "new".into(),
            tag_ids: None,
        },
    )
    .await
    .unwrap();
    let summary = db::get_memo_summary(&pool, memo).await.unwrap();
    assert_eq!(summary.content, "new");
    assert_eq!(summary.title, "title");
    assert_eq!(summary.tags.len(), 1);

    db::update_memo(
        &pool,
        memo,
        db::UpdateMemo {
            content: "newer".into(),
            tag_ids: Some(vec![b]),
        },
    )
    .await
    .unwrap();
    let summary = db::get_memo_summary(&pool, memo).await.unwrap();
    let tag_ids: Vec<i64> = summary.tags.iter().map(|t| t.id).collect();
    assert_eq!(tag_ids, vec![b]);
}

#[tokio::test]
async fn test_duplicate_tag_name() {
    let pool = setup_test_db().await;
    create_test_tag(&pool, "rust", 0).await;
    let result = db::create_tag(
        &pool,
        db::CreateTag {
            name: "rust".into(),
            priority: 1,
        },
    )
    .await;
    match result {
        Err(Error::Validation(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "name");
            assert_eq!(errors[0].message, "has already been taken");
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_renaming_tag_onto_existing_name() {
    let pool = setup_test_db().await;
    create_test_tag(&pool, "rust", 0).await;
    let other = create_test_tag(&pool, "go", 1).await;

    let result = db::update_tag(
        &pool,
        other,
        db::UpdateTag {
            name: Some("rust".into()),
            priority: None,
        },
    )
    .await;
    assert!(matches!(result, Err(Error::Validation(ref errors)) if errors[0].field == "name"));
}
