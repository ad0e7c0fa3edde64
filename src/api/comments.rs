//! Comment Routes
//!
//! Routes:
//! - POST /memos/:id/comments - Add a comment to a memo
//! - PUT /memos/:id/comments/:comment_id - Edit a comment

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::db;
use crate::{AppState, Result};

/// Build comment routes, nested under /memos.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id/comments", post(create_comment))
        .route("/:id/comments/:comment_id", put(update_comment))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: CommentBody,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    pub content: String,
}

/// POST /memos/:id/comments
#[axum::debug_handler]
async fn create_comment(
    State(state): State<AppState>,
    Path(memo_id): Path<i64>,
    Json(request): Json<CommentRequest>,
) -> Result<StatusCode> {
    db::create_comment(
        &state.db,
        memo_id,
        db::CreateComment {
            content: request.comment.content,
        },
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /memos/:id/comments/:comment_id
#[axum::debug_handler]
async fn update_comment(
    State(state): State<AppState>,
    Path((memo_id, comment_id)): Path<(i64, i64)>,
    Json(request): Json<CommentRequest>,
) -> Result<StatusCode> {
    db::update_comment(&state.db, memo_id, comment_id, &request.comment.content).await?;
    Ok(StatusCode::NO_CONTENT)
}
