use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;

use crate::server::ShooterServer;

use super::connection::handle_socket;

/// WebSocket upgrade entry point. Every connection is accepted and paired
/// into a room; there is no authentication gate before the upgrade.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(server): State<Arc<ShooterServer>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}
