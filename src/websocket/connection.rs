use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::protocol::PlayerId;
use crate::server::connections::OutboundFrame;
use crate::server::ShooterServer;

/// Bridges a raw WebSocket to the connection registry: a send task drains
/// the player's outbound queue onto the socket, a receive task feeds
/// incoming text frames to [`ShooterServer::handle_frame`]. The connection
/// is torn down and the player unregistered the instant either side closes.
pub(super) async fn handle_socket(socket: WebSocket, server: Arc<ShooterServer>) {
    let (mut sender, mut receiver) = socket.split();
    let player_id = PlayerId::new_v4();
    let mut rx = server.register_client(player_id).await;
    tracing::info!(%player_id, "websocket connection established");

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match frame {
                OutboundFrame::Typed(message) => serde_json::to_string(message.as_ref()),
                OutboundFrame::Raw(value) => serde_json::to_string(value.as_ref()),
            };
            let text = match text {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(%player_id, %err, "failed to serialize outbound frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let server_clone = server.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    server_clone.handle_frame(player_id, &text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }

    server.unregister_client(player_id).await;
}
