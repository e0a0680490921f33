//! WebSocket upgrade route.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::handlers::handle_websocket_connection;
use crate::AppState;

/// Query parameters for the upgrade.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Free-form label identifying the client in logs
    #[serde(default = "anonymous")]
    pub client: String,
}

fn anonymous() -> String {
    "anonymous".to_string()
}

/// Create WebSocket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade_handler))
}

/// GET /ws - Subscribe to change notifications.
async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> Response {
    ws.on_upgrade(move |socket| {
        handle_websocket_connection(socket, state.sync, state.conn_manager, params.client)
    })
}
