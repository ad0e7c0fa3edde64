//! Memo Archive - searchable archive of chat posts
//!
//! Stores memos, tags and comments in SQLite, imports reaction-marked chat
//! posts idempotently, and serves a JSON API over axum.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::{Error, Result};
pub use state::AppState;

/// Build the application router with its middleware stack.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(api::routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
