//! Markersync Server - keeps a SQLite marker cache in step with a remote feed.
//!
//! The daemon fetches the feed on a timer, reconciles it against the cache
//! with the markersync engine, and exposes the cache over HTTP. WebSocket
//! clients are told every time a sync cycle commits.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod routes;
pub mod sync;
pub mod websocket;

use crate::config::Config;
use crate::db::Pool;
use crate::sync::SyncService;
use crate::websocket::ConnectionManager;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
    pub sync: Arc<SyncService>,
}

/// Build the router with all routes and layers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
