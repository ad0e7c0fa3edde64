//! Chat Import Routes
//!
//! Routes:
//! - PUT /slack/posts - Import reaction-marked posts
//! - PUT /slack/files - Import exported history files of one channel
//! - GET /slack/posters - List cached posters
//! - PUT /slack/posters - Refresh poster names

use axum::{extract::State, routing::put, Json, Router};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::models::Poster;
use crate::services::ImportReport;
use crate::{AppState, Error, Result};

/// Build chat import routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", put(import_posts))
        .route("/files", put(import_files))
        .route("/posters", put(sync_posters).get(list_posters))
}

#[derive(Debug, Deserialize)]
pub struct ImportFilesRequest {
    #[serde(default)]
    pub channel_id: String,
}

#[derive(Debug, Serialize)]
pub struct SyncPostersResponse {
    pub posters: usize,
}

#[derive(Debug, Serialize)]
pub struct ListPostersResponse {
    pub posters: Vec<Poster>,
}

/// Run a full import.
///
/// PUT /slack/posts
///
/// All-or-nothing: on failure nothing is written and the error is returned.
#[axum::debug_handler]
async fn import_posts(State(state): State<AppState>) -> Result<Json<ImportReport>> {
    let report = state.importer.run().await?;
    Ok(Json(report))
}

/// PUT /slack/files
#[axum::debug_handler]
async fn import_files(
    State(state): State<AppState>,
    Json(request): Json<ImportFilesRequest>,
) -> Result<Json<ImportReport>> {
    let channel_id = request.channel_id.trim();
    if channel_id.is_empty() {
        return Err(Error::field("channel_id", "can't be blank"));
    }
    let report = state.importer.run_export(channel_id).await?;
    Ok(Json(report))
}

/// GET /slack/posters
#[axum::debug_handler]
async fn list_posters(State(state): State<AppState>) -> Result<Json<ListPostersResponse>> {
    let posters = db::list_posters(&state.db).await?;
    Ok(Json(ListPostersResponse { posters }))
}

/// PUT /slack/posters
#[axum::debug_handler]
async fn sync_posters(State(state): State<AppState>) -> Result<Json<SyncPostersResponse>> {
    let posters = state.importer.sync_posters().await?;
    Ok(Json(SyncPostersResponse { posters }))
}
