//! Memo Routes
//!
//! Listing through the query pipeline plus CRUD.
//!
//! Routes:
//! - GET /memos - List memos (title, content, tag_ids, order, page)
//!
//! `tag_ids` may be a comma list, a repeated key or `tag_ids[]`.
//! - POST /memos - Create a memo
//! - GET /memos/:id - Get a memo with its tags and comments
//! - PUT /memos/:id - Update a memo's content and tags
//! - DELETE /memos/:id - Delete a memo

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::extract::{Query, QueryRejection};
use serde::{Deserialize, Serialize};

use crate::db::{self, MemoPage, MemoQueryParams};
use crate::models::{Comment, MemoSummary};
use crate::{AppState, Error, Result};

use super::parse_id_list;

/// Build memo routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_memos).post(create_memo))
        .route("/:id", get(get_memo).put(update_memo).delete(delete_memo))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing memos.
#[derive(Debug, Deserialize, Default)]
pub struct ListMemosQuery {
    /// Substring of the title (case-sensitive)
    pub title: Option<String>,
    /// Substring of the content (case-sensitive)
    pub content: Option<String>,
    /// Tag ids; a memo matches if it has any of them
    #[serde(default, alias = "tag_ids[]")]
    pub tag_ids: Vec<String>,
    /// `asc` or `desc` (default)
    pub order: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
}

impl ListMemosQuery {
    fn into_params(self) -> Result<MemoQueryParams> {
        let mut tag_ids = Vec::new();
        for raw in &self.tag_ids {
            tag_ids.extend(parse_id_list("tag_ids", raw)?);
        }

        Ok(MemoQueryParams {
            tag_ids,
            title: self.title,
            content: self.content,
            order: self.order,
            page: self.page,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MemoRequest<T> {
    pub memo: T,
}

#[derive(Debug, Deserialize)]
pub struct CreateMemoBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemoBody {
    #[serde(default)]
    pub content: String,
    pub tag_ids: Option<Vec<i64>>,
}

/// Memo with its comments.
#[derive(Debug, Serialize)]
pub struct MemoDetailResponse {
    pub memo: MemoSummary,
    pub comments: Vec<Comment>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List memos.
///
/// GET /memos
#[axum::debug_handler]
async fn list_memos(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListMemosQuery>, QueryRejection>,
) -> Result<Json<MemoPage>> {
    let Query(query) = query.map_err(|e| Error::InvalidInput(e.to_string()))?;
    let params = query.into_params()?;
    let page = db::query_memos(&state.db, &params).await?;
    Ok(Json(page))
}

/// Create a memo.
///
/// POST /memos
#[axum::debug_handler]
async fn create_memo(
    State(state): State<AppState>,
    Json(request): Json<MemoRequest<CreateMemoBody>>,
) -> Result<StatusCode> {
    let body = request.memo;
    let memo = db::create_memo(
        &state.db,
        db::CreateMemo {
            title: body.title,
            content: body.content,
            tag_ids: body.tag_ids,
        },
    )
    .await?;

    tracing::info!(memo_id = memo.id, "Memo created");
    Ok(StatusCode::NO_CONTENT)
}

/// Get a memo with tags and comments.
///
/// GET /memos/:id
#[axum::debug_handler]
async fn get_memo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MemoDetailResponse>> {
    let memo = db::get_memo_summary(&state.db, id).await?;
    let comments = db::list_memo_comments(&state.db, id).await?;
    Ok(Json(MemoDetailResponse { memo, comments }))
}

/// Update a memo.
///
/// PUT /memos/:id
#[axum::debug_handler]
async fn update_memo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<MemoRequest<UpdateMemoBody>>,
) -> Result<StatusCode> {
    let body = request.memo;
    db::update_memo(
        &state.db,
        id,
        db::UpdateMemo {
            content: body.content,
            tag_ids: body.tag_ids,
        },
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a memo and everything attached to it.
///
/// DELETE /memos/:id
#[axum::debug_handler]
async fn delete_memo(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    db::delete_memo(&state.db, id).await?;
    tracing::info!(memo_id = id, "Memo deleted");
    Ok(StatusCode::NO_CONTENT)
}
