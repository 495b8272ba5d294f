//! Tracks each connected player's outbound queue. Delivery is fire-and-forget
//! from the simulation's point of view: a full queue means a slow client, and
//! the frame is dropped rather than blocking the sim or scheduler loop.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{PlayerId, ServerMessage};

/// One queued outbound item: either a typed message constructed by the
/// router/broadcast helper, or a raw envelope value for the legacy
/// unknown-message-type pass-through path, which by definition has no typed
/// shape.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Typed(Arc<ServerMessage>),
    Raw(Arc<Value>),
}

pub struct Connections {
    senders: DashMap<PlayerId, mpsc::Sender<OutboundFrame>>,
}

impl Connections {
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
        }
    }

    pub fn register(&self, player_id: PlayerId, capacity: usize) -> mpsc::Receiver<OutboundFrame> {
        let (tx, rx) = mpsc::channel(capacity);
        self.senders.insert(player_id, tx);
        rx
    }

    pub fn unregister(&self, player_id: PlayerId) {
        self.senders.remove(&player_id);
    }

    /// Enqueues `message` for `player_id`. Never blocks: a full queue or a
    /// disconnected receiver are both silently dropped (logged at debug),
    /// since the write-side connection task is what owns shutdown.
    pub fn send(&self, player_id: PlayerId, message: Arc<ServerMessage>) {
        self.send_frame(player_id, OutboundFrame::Typed(message));
    }

    pub fn send_raw(&self, player_id: PlayerId, value: Arc<Value>) {
        self.send_frame(player_id, OutboundFrame::Raw(value));
    }

    fn send_frame(&self, player_id: PlayerId, frame: OutboundFrame) {
        let Some(sender) = self.senders.get(&player_id) else {
            return;
        };
        if let Err(err) = sender.try_send(frame) {
            debug!(player_id = %player_id, error = %err, "dropped outbound message");
        }
    }

    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.senders.contains_key(&player_id)
    }
}

impl Default for Connections {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_player_receives_sent_message() {
        let connections = Connections::new();
        let id = PlayerId::new_v4();
        let mut rx = connections.register(id, 8);

        connections.send(
            id,
            Arc::new(ServerMessage::Error {
                message: "hi".to_string(),
            }),
        );
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, OutboundFrame::Typed(_)));
    }

    #[tokio::test]
    async fn raw_frames_are_delivered_untyped() {
        let connections = Connections::new();
        let id = PlayerId::new_v4();
        let mut rx = connections.register(id, 8);

        connections.send_raw(id, Arc::new(serde_json::json!({"type": "legacy:ping"})));
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, OutboundFrame::Raw(_)));
    }

    #[test]
    fn sending_to_unregistered_player_is_a_silent_no_op() {
        let connections = Connections::new();
        connections.send(
            PlayerId::new_v4(),
            Arc::new(ServerMessage::Error {
                message: "x".to_string(),
            }),
        );
    }

    #[test]
    fn unregister_removes_connectivity() {
        let connections = Connections::new();
        let id = PlayerId::new_v4();
        let _rx = connections.register(id, 8);
        assert!(connections.is_connected(id));
        connections.unregister(id);
        assert!(!connections.is_connected(id));
    }
}
