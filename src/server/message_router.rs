//! Ingress handling: JSON envelope parsing, schema validation, and one
//! handler per [`ClientMessage`] variant. Split from `mod.rs` the way the
//! ambient server keeps connection orchestration and message dispatch in
//! separate files.

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::protocol::{ClientEnvelope, ClientMessage, PlayerId, ServerMessage};
use crate::world::{PickupOutcome, ShootOutcome};

use super::ShooterServer;

/// Message types that carry a `data` payload validated against an ingress
/// schema before being parsed. `player:reload` carries no payload and has
/// no corresponding schema file.
fn requires_ingress_schema(message_type: &str) -> bool {
    matches!(
        message_type,
        "input:state"
            | "player:shoot"
            | "player:melee_attack"
            | "player:dodge_roll"
            | "weapon:pickup_attempt"
    )
}

impl ShooterServer {
    /// Entry point from the websocket receive loop: parses the envelope,
    /// validates it against its ingress schema when one applies, decodes it
    /// into a typed [`ClientMessage`], and dispatches. Any failure along the
    /// way is logged and the frame is dropped; it never tears down the
    /// connection.
    pub async fn handle_frame(&self, player_id: PlayerId, text: &str) {
        self.metrics().messages_in.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let envelope: ClientEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                debug!(%player_id, %err, "dropping frame with invalid envelope JSON");
                return;
            }
        };

        if requires_ingress_schema(&envelope.message_type) {
            let schema_name = ClientMessage::schema_name(&envelope.message_type);
            if let Err(err) = self.schema_validator().validate_ingress(&schema_name, &envelope.data) {
                self.metrics().schema_validation_failures.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                debug!(%player_id, schema = %schema_name, %err, "dropping frame that failed ingress validation");
                return;
            }
        }

        let message = match ClientMessage::from_envelope(&envelope) {
            Ok(message) => message,
            Err(err) => {
                debug!(%player_id, %err, "dropping frame with mismatched payload shape");
                return;
            }
        };

        self.handle_client_message(player_id, message).await;
    }

    pub async fn handle_client_message(&self, player_id: PlayerId, message: ClientMessage) {
        match message {
            ClientMessage::InputState(input) => {
                self.handle_input_state(player_id, input).await;
            }
            ClientMessage::PlayerShoot { aim_angle } => {
                self.handle_player_shoot(player_id, aim_angle).await;
            }
            ClientMessage::PlayerReload => {
                self.handle_player_reload(player_id).await;
            }
            ClientMessage::PlayerMeleeAttack { aim_angle } => {
                self.handle_melee_attack(player_id, aim_angle).await;
            }
            ClientMessage::PlayerDodgeRoll { aim_angle } => {
                self.handle_dodge_roll(player_id, aim_angle).await;
            }
            ClientMessage::WeaponPickupAttempt { crate_id } => {
                self.handle_pickup_attempt(player_id, crate_id).await;
            }
            ClientMessage::Unknown { message_type, data } => {
                self.handle_unknown(player_id, message_type, data).await;
            }
        }
    }

    async fn handle_input_state(&self, player_id: PlayerId, input: crate::protocol::PlayerInput) {
        if self.match_ended_for_player(player_id) {
            return;
        }
        self.world().write().await.update_player_input(player_id, input);
    }

    async fn handle_player_shoot(&self, player_id: PlayerId, aim_angle: f64) {
        if self.match_ended_for_player(player_id) {
            return;
        }
        let Some(room_id) = self.room_manager().room_id_for_player(player_id) else {
            return;
        };

        let now = Instant::now();
        let outcome = self.world().write().await.player_shoot(player_id, aim_angle, now);
        match outcome {
            ShootOutcome::Spawned { .. } => {
                self.broadcast_room_projectiles(room_id).await;
                if let Some(weapon) = self.world().read().await.get_weapon_state(player_id) {
                    self.send_weapon_state(player_id, weapon);
                }
            }
            ShootOutcome::Failed(reason) => {
                self.broadcast().send_to_player(player_id, ServerMessage::ShootFailed { reason });
            }
        }
    }

    async fn handle_player_reload(&self, player_id: PlayerId) {
        if self.match_ended_for_player(player_id) {
            return;
        }
        let now = Instant::now();
        let started = self.world().write().await.player_reload(player_id, now);
        if !started {
            return;
        }
        // Reflects the just-started reload; the follow-up `weapon:state`
        // once it actually finishes comes from the `ReloadComplete` world
        // event handled by the scheduler.
        if let Some(weapon) = self.world().read().await.get_weapon_state(player_id) {
            self.send_weapon_state(player_id, weapon);
        }
    }

    /// Melee has no per-victim damage/health in its return type, so unlike
    /// a projectile hit it broadcasts a single combined `melee:hit` instead
    /// of the `player:damaged` → `hit:confirmed` → `player:death` →
    /// `player:kill_credit` cascade.
    async fn handle_melee_attack(&self, player_id: PlayerId, aim_angle: f64) {
        if self.match_ended_for_player(player_id) {
            return;
        }
        let Some(room_id) = self.room_manager().room_id_for_player(player_id) else {
            return;
        };

        let now = Instant::now();
        let hits = self.world().write().await.player_melee_attack(player_id, aim_angle, now);
        if hits.is_empty() {
            return;
        }

        let victim_ids: Vec<PlayerId> = hits.iter().map(|(id, _)| *id).collect();
        let killed: Vec<PlayerId> = hits.iter().filter(|(_, killed)| *killed).map(|(id, _)| *id).collect();
        self.broadcast().broadcast_room(
            room_id,
            ServerMessage::MeleeHit {
                attacker_id: player_id,
                victim_ids,
                killed: killed.clone(),
            },
            None,
        );

        for _ in &killed {
            self.credit_match_kill_and_maybe_end(room_id, player_id).await;
        }
    }

    async fn handle_dodge_roll(&self, player_id: PlayerId, aim_angle: f64) {
        if self.match_ended_for_player(player_id) {
            return;
        }
        let Some(room_id) = self.room_manager().room_id_for_player(player_id) else {
            return;
        };

        let now = Instant::now();
        let started = self.world().write().await.player_dodge_roll(player_id, aim_angle, now);
        if started {
            self.broadcast().broadcast_room(room_id, ServerMessage::RollStart { player_id }, None);
        }
    }

    /// Checked in order: room membership, then proximity, before touching
    /// the shared World — a player cannot pick up a crate from outside
    /// their room, even if they somehow know its id.
    async fn handle_pickup_attempt(&self, player_id: PlayerId, crate_id: crate::protocol::CrateId) {
        if self.match_ended_for_player(player_id) {
            return;
        }
        let Some(room_id) = self.room_manager().room_id_for_player(player_id) else {
            return;
        };

        let now = Instant::now();
        let in_range = {
            let world = self.world().read().await;
            let (Some(player), Some(c)) = (world.get_player_state(player_id), world.get_crate(crate_id)) else {
                return;
            };
            player.position.distance_to(c.position) <= self.config().server.pickup_radius_px
        };
        if !in_range {
            return;
        }

        match self.world().write().await.apply_pickup(player_id, crate_id, now) {
            PickupOutcome::Confirmed { weapon_type } => {
                let next_respawn_time =
                    chrono::Utc::now().timestamp_millis() + self.config().simulation.weapon_respawn_delay_ms as i64;
                // Goes to every room member, not just the picking-up player
                // (both need to know the crate is gone and who holds it now).
                self.broadcast().broadcast_room(
                    room_id,
                    ServerMessage::WeaponPickupConfirmed {
                        player_id,
                        crate_id,
                        weapon_type,
                        next_respawn_time,
                    },
                    None,
                );
                if let Some(weapon) = self.world().read().await.get_weapon_state(player_id) {
                    self.send_weapon_state(player_id, weapon);
                }
            }
            PickupOutcome::NotAvailable | PickupOutcome::UnknownCrate | PickupOutcome::UnknownPlayer => {
                self.broadcast().send_to_player(
                    player_id,
                    ServerMessage::Error {
                        message: "weapon crate is not available for pickup".to_string(),
                    },
                );
            }
        }
    }

    /// Legacy pass-through for message types this server doesn't know
    /// about: re-broadcasts the raw envelope to the rest of the sender's
    /// room, untyped and unvalidated.
    async fn handle_unknown(&self, player_id: PlayerId, message_type: String, data: serde_json::Value) {
        warn!(%player_id, %message_type, "passing through unrecognized message type");
        let Some(room_id) = self.room_manager().room_id_for_player(player_id) else {
            return;
        };
        let envelope = serde_json::json!({ "type": message_type, "data": data });
        self.broadcast().broadcast_raw_room(room_id, envelope, Some(player_id));
    }
}
