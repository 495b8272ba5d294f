//! Broadcast Helper: sanitizes outgoing player state, diffs it through the
//! Delta Tracker, optionally validates egress payloads against schema, and
//! fans the resulting frames out to a room's connections. Grounded in the
//! ambient server's `BroadcastMessage` (Arc-wrapped message, cheap clone
//! for fan-out) and `PlayerIdList` (`SmallVec`-backed room recipient list).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::RngExt;
use smallvec::SmallVec;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::NetworkSimConfig;
use crate::delta::DeltaTracker;
use crate::metrics::ServerMetrics;
use crate::protocol::{ClientMessage, PlayerId, ServerMessage};
use crate::room::RoomManager;
use crate::schema::SchemaValidator;
use crate::server::connections::Connections;
use crate::world::player::PlayerStateSnapshot;
use serde_json::Value;

/// Stack-allocated for typical room sizes; heap-spills past 8 recipients.
pub type PlayerIdList = SmallVec<[PlayerId; 8]>;

/// The egress schema name for a `ServerMessage`, derived the same way as
/// ingress names: the `type` tag with `:`/`_` replaced by `-`, suffixed
/// `-data`.
fn egress_schema_name(message: &ServerMessage) -> Option<String> {
    let value = serde_json::to_value(message).ok()?;
    let type_tag = value.get("type")?.as_str()?;
    Some(ClientMessage::schema_name(type_tag))
}

pub struct BroadcastHelper {
    connections: Arc<Connections>,
    room_manager: Arc<RoomManager>,
    delta_tracker: DeltaTracker,
    schema_validator: Arc<SchemaValidator>,
    validate_egress: bool,
    network_sim: NetworkSimConfig,
    metrics: Arc<ServerMetrics>,
}

impl BroadcastHelper {
    pub fn new(
        connections: Arc<Connections>,
        room_manager: Arc<RoomManager>,
        snapshot_interval: Duration,
        schema_validator: Arc<SchemaValidator>,
        validate_egress: bool,
        network_sim: NetworkSimConfig,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            connections,
            room_manager,
            delta_tracker: DeltaTracker::new(snapshot_interval),
            schema_validator,
            validate_egress,
            network_sim: network_sim.clamped(),
            metrics,
        }
    }

    pub fn delta_tracker(&self) -> &DeltaTracker {
        &self.delta_tracker
    }

    /// Drops non-finite player state from a frame before it's diffed or
    /// sent: positions/velocities that are NaN/±∞ cause that player to be
    /// skipped entirely (logged); a non-finite aim angle is replaced with
    /// 0 rather than dropping the whole player.
    pub fn sanitize(&self, players: &[PlayerStateSnapshot]) -> Vec<PlayerStateSnapshot> {
        players
            .iter()
            .filter_map(|p| {
                if !p.position.is_finite() || !p.velocity.is_finite() {
                    warn!(player_id = %p.id, "dropping non-finite player state from broadcast frame");
                    return None;
                }
                let mut sanitized = *p;
                if !p.aim_angle.is_finite() {
                    sanitized.aim_angle = 0.0;
                }
                Some(sanitized)
            })
            .collect()
    }

    /// Sends `message` to a single player's outbound queue, applying
    /// network simulation and optional egress validation.
    pub fn send_to_player(&self, player_id: PlayerId, message: ServerMessage) {
        self.dispatch(player_id, Arc::new(message));
    }

    /// Sends `message` to every member of `room_id` except `exclude`, if
    /// given.
    pub fn broadcast_room(&self, room_id: crate::protocol::RoomId, message: ServerMessage, exclude: Option<PlayerId>) {
        let members: PlayerIdList = self
            .room_manager
            .room_member_ids(room_id)
            .into_iter()
            .filter(|id| Some(*id) != exclude)
            .collect();
        let arc_message = Arc::new(message);
        for member in members {
            self.dispatch(member, arc_message.clone());
        }
    }

    /// Re-broadcasts an unrecognized message type's raw `{type, timestamp,
    /// data}` envelope, verbatim, to the rest of the sender's room (legacy
    /// pass-through; this path has no typed egress shape to validate or
    /// sanitize).
    pub fn broadcast_raw_room(&self, room_id: crate::protocol::RoomId, envelope: Value, exclude: Option<PlayerId>) {
        let members: PlayerIdList = self
            .room_manager
            .room_member_ids(room_id)
            .into_iter()
            .filter(|id| Some(*id) != exclude)
            .collect();
        let arc_value = Arc::new(envelope);
        for member in members {
            self.connections.send_raw(member, arc_value.clone());
        }
    }

    fn dispatch(&self, player_id: PlayerId, message: Arc<ServerMessage>) {
        if self.validate_egress {
            if let Some(schema_name) = egress_schema_name(&message) {
                if let Ok(value) = serde_json::to_value(message.as_ref()) {
                    if let Err(err) = self.schema_validator.validate_egress(&schema_name, &value) {
                        self.metrics.schema_validation_failures.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        debug!(player_id = %player_id, schema = %schema_name, error = %err, "egress schema validation failed");
                    }
                }
            }
        }

        if self.network_sim.simulate_packet_loss_percent > 0 {
            let roll = rand::rng().random_range(0..100);
            if roll < self.network_sim.simulate_packet_loss_percent as u32 {
                self.metrics.frames_dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                return;
            }
        }

        self.metrics.messages_out.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        if self.network_sim.simulate_latency_ms == 0 {
            self.connections.send(player_id, message);
            return;
        }

        // Artificial latency is a local-testing aid only: the delayed send
        // detaches from the caller's ordering, which is acceptable since
        // this knob defaults to off and is never enabled in production.
        let base = self.network_sim.simulate_latency_ms;
        let jitter = rand::rng().random_range(0..40) as i64 - 20;
        let delay = (base as i64 + jitter).max(0) as u64;
        let connections = self.connections.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            connections.send(player_id, message);
        });
    }

    pub fn remove_client(&self, player_id: PlayerId) {
        self.delta_tracker.remove_client(player_id);
    }

    /// Builds and sends the `player:move` payload to `recipient` given the
    /// room's current players; emits nothing if there is nothing to report.
    pub fn broadcast_player_move(&self, recipient: PlayerId, players: &[PlayerStateSnapshot], now: Instant) {
        let sanitized = self.sanitize(players);
        let (wire, is_snapshot) = self.delta_tracker.player_move_payload(recipient, &sanitized, now);
        if wire.is_empty() && !is_snapshot {
            return;
        }
        self.send_to_player(
            recipient,
            ServerMessage::PlayerMove {
                players: wire,
                is_snapshot,
            },
        );
    }

    pub fn broadcast_projectile_diff(&self, recipient: PlayerId, current_ids: &HashSet<crate::protocol::ProjectileId>, current: &[crate::world::ProjectileSnapshot]) {
        let (added, removed) = self.delta_tracker.projectile_diff(recipient, current_ids);
        if !added.is_empty() {
            let projectiles = current
                .iter()
                .filter(|p| added.contains(&p.id))
                .map(|p| crate::protocol::ProjectileWire {
                    id: p.id,
                    owner_id: p.owner_id,
                    position: p.position,
                    velocity: p.velocity,
                })
                .collect();
            self.send_to_player(recipient, ServerMessage::ProjectileSpawn { projectiles });
        }
        if !removed.is_empty() {
            self.send_to_player(recipient, ServerMessage::ProjectileDespawn { ids: removed });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Vec2;

    fn snapshot(id: PlayerId, position: Vec2, aim_angle: f64) -> PlayerStateSnapshot {
        PlayerStateSnapshot {
            id,
            position,
            velocity: Vec2::ZERO,
            aim_angle,
            health: 100.0,
            is_alive: true,
            is_invulnerable: false,
            rolling: false,
            is_regenerating_health: false,
            kills: 0,
            deaths: 0,
            xp: 0,
        }
    }

    fn helper() -> BroadcastHelper {
        BroadcastHelper::new(
            Arc::new(Connections::new()),
            Arc::new(RoomManager::new(2, 10, Duration::from_secs(420))),
            Duration::from_secs(1),
            Arc::new(SchemaValidator::with_no_schemas()),
            false,
            NetworkSimConfig::default(),
            Arc::new(ServerMetrics::default()),
        )
    }

    #[test]
    fn sanitize_drops_non_finite_position() {
        let helper = helper();
        let id = PlayerId::new_v4();
        let bad = snapshot(id, Vec2::new(f64::NAN, 0.0), 0.0);
        let sanitized = helper.sanitize(&[bad]);
        assert!(sanitized.is_empty());
    }

    #[test]
    fn sanitize_zeroes_non_finite_aim_angle() {
        let helper = helper();
        let id = PlayerId::new_v4();
        let weird = snapshot(id, Vec2::new(1.0, 1.0), f64::INFINITY);
        let sanitized = helper.sanitize(&[weird]);
        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized[0].aim_angle, 0.0);
    }

    #[test]
    fn finite_state_passes_through_unchanged() {
        let helper = helper();
        let id = PlayerId::new_v4();
        let good = snapshot(id, Vec2::new(5.0, 5.0), 1.2);
        let sanitized = helper.sanitize(&[good]);
        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized[0].position, Vec2::new(5.0, 5.0));
    }
}
