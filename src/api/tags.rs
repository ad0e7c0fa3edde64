//! Tag Routes
//!
//! Routes:
//! - GET /tags - List tags by priority
//! - POST /tags - Create a tag
//! - GET /tags/:id - Get a tag
//! - PUT /tags/:id - Update a tag
//! - DELETE /tags/:id - Delete a tag

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::models::Tag;
use crate::{AppState, Result};

/// Build tag routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/:id", get(get_tag).put(update_tag).delete(delete_tag))
}

#[derive(Debug, Deserialize)]
pub struct TagRequest<T> {
    pub tag: T,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagBody {
    pub name: Option<String>,
    pub priority: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListTagsResponse {
    pub tags: Vec<Tag>,
}

/// GET /tags
#[axum::debug_handler]
async fn list_tags(State(state): State<AppState>) -> Result<Json<ListTagsResponse>> {
    let tags = db::list_tags(&state.db).await?;
    Ok(Json(ListTagsResponse { tags }))
}

/// POST /tags
#[axum::debug_handler]
async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<TagRequest<CreateTagBody>>,
) -> Result<(StatusCode, Json<Tag>)> {
    let tag = db::create_tag(
        &state.db,
        db::CreateTag {
            name: request.tag.name,
            priority: request.tag.priority,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// GET /tags/:id
#[axum::debug_handler]
async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Tag>> {
    let tag = db::get_tag(&state.db, id).await?;
    Ok(Json(tag))
}

/// PUT /tags/:id
#[axum::debug_handler]
async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TagRequest<UpdateTagBody>>,
) -> Result<Json<Tag>> {
    let tag = db::update_tag(
        &state.db,
        id,
        db::UpdateTag {
            name: request.tag.name,
            priority: request.tag.priority,
        },
    )
    .await?;
    Ok(Json(tag))
}

/// DELETE /tags/:id
#[axum::debug_handler]
async fn delete_tag(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    db::delete_tag(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
