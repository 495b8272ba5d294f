//! Server orchestration: the shared [`World`], per-room pairing, the
//! connection registry, and the handlers that turn client messages and
//! [`WorldEvent`]s into broadcasts. The transport layer (`websocket`) and
//! the Clock & Tick Scheduler (`scheduler`) both hold an `Arc<ShooterServer>`
//! and call into the methods here; this module owns no socket state itself.

pub mod connections;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tracing::info;

use crate::broadcast::BroadcastHelper;
use crate::config::Config;
use crate::match_state::MatchPhase;
use crate::metrics::{ServerMetrics, ServerMetricsSnapshot};
use crate::protocol::{MatchEndReason, PlayerId, RoomId, ServerMessage};
use crate::room::RoomManager;
use crate::schema::SchemaValidator;
use crate::world::events::{ChannelEventSink, WorldEvent};
use crate::world::World;

use connections::{Connections, OutboundFrame};

/// Ties together the shared simulation, room pairing, connection registry
/// and broadcast fan-out. One instance per running process.
pub struct ShooterServer {
    config: Arc<Config>,
    connections: Arc<Connections>,
    room_manager: Arc<RoomManager>,
    world: RwLock<World>,
    broadcast: BroadcastHelper,
    schema_validator: Arc<SchemaValidator>,
    metrics: Arc<ServerMetrics>,
}

impl ShooterServer {
    /// Builds the server and returns the receiving half of the World's event
    /// channel for the scheduler to drain; the World never holds a handle
    /// back into this struct.
    pub fn new(config: Arc<Config>, schema_validator: Arc<SchemaValidator>) -> (Arc<Self>, mpsc::UnboundedReceiver<WorldEvent>) {
        let metrics = Arc::new(ServerMetrics::default());
        let connections = Arc::new(Connections::new());
        let room_manager = Arc::new(RoomManager::new(
            config.server.room_capacity,
            config.server.default_kill_target,
            Duration::from_secs(config.server.default_time_limit_secs),
        ));
        let broadcast = BroadcastHelper::new(
            connections.clone(),
            room_manager.clone(),
            Duration::from_millis(config.server.snapshot_interval_ms),
            schema_validator.clone(),
            config.schema.validate_egress,
            config.network_sim.clone(),
            metrics.clone(),
        );
        let (sink, events) = ChannelEventSink::new();
        let world = RwLock::new(World::new(Arc::new(config.simulation.clone()), Arc::new(sink)));

        let server = Arc::new(Self {
            config,
            connections,
            room_manager,
            world,
            broadcast,
            schema_validator,
            metrics,
        });
        (server, events)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics_snapshot(&self) -> ServerMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn metrics_prometheus(&self) -> String {
        self.metrics.render_prometheus()
    }

    pub async fn health_check(&self) -> bool {
        true
    }

    /// Registers a newly connected player: gives it an outbound queue, adds
    /// it to the shared World, and pairs it into a room. If this is the
    /// player that finalizes a room, announces `room:joined` and
    /// `weapon:spawned` to every member of that room.
    pub async fn register_client(&self, player_id: PlayerId) -> mpsc::Receiver<OutboundFrame> {
        let rx = self.connections.register(player_id, self.config.server.outbound_queue_capacity);
        self.metrics.active_connections.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.world.write().await.add_player(player_id);

        let now = Instant::now();
        if let Some(room_id) = self.room_manager.add_player(player_id, now) {
            self.metrics.active_rooms.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.announce_room_joined(room_id).await;
        }

        rx
    }

    /// Reverses `register_client`: drops the connection, the delta-tracker
    /// state, the room membership, and the World's player record.
    pub async fn unregister_client(&self, player_id: PlayerId) {
        info!(%player_id, "connection closed");
        self.connections.unregister(player_id);
        self.broadcast.remove_client(player_id);
        if self.room_manager.remove_player(player_id) {
            self.metrics.active_rooms.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
        }
        self.world.write().await.remove_player(player_id);
        self.metrics.active_connections.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
    }

    async fn announce_room_joined(&self, room_id: RoomId) {
        let members = self.room_manager.room_member_ids(room_id);
        let (kill_target, time_limit_seconds) = self
            .room_manager
            .with_match(room_id, |m| (m.kill_target(), m.time_limit_secs()))
            .unwrap_or((0, 0));

        for &player_id in &members {
            let peer_ids = members.iter().copied().filter(|&id| id != player_id).collect();
            self.broadcast.send_to_player(
                player_id,
                ServerMessage::RoomJoined {
                    player_id,
                    room_id,
                    peer_ids,
                    kill_target,
                    time_limit_seconds,
                },
            );
        }

        let crates = {
            let world = self.world.read().await;
            world
                .get_all_crates()
                .into_iter()
                .map(|c| crate::protocol::CrateWire {
                    id: c.id,
                    weapon_type: c.weapon_type,
                    position: c.position,
                    is_available: c.is_available,
                })
                .collect::<Vec<_>>()
        };
        self.broadcast.broadcast_room(room_id, ServerMessage::WeaponSpawned { crates }, None);
    }

    /// Shared by the `player:shoot` handler and the scheduler's per-tick
    /// broadcast pass: builds the room-scoped projectile set and diffs it
    /// per recipient, so an immediate post-shoot broadcast and the next
    /// periodic tick never announce the same spawn twice.
    pub(super) async fn broadcast_room_projectiles(&self, room_id: RoomId) {
        let members = self.room_manager.room_member_ids(room_id);
        let projectiles = {
            let world = self.world.read().await;
            world.get_all_projectiles()
        };
        let room_projectiles: Vec<_> = projectiles
            .into_iter()
            .filter(|p| members.contains(&p.owner_id))
            .collect();
        let current_ids: std::collections::HashSet<_> = room_projectiles.iter().map(|p| p.id).collect();
        for &member in &members {
            self.broadcast.broadcast_projectile_diff(member, &current_ids, &room_projectiles);
        }
    }

    /// `true` iff `player_id` is in a room whose match has already ended.
    /// A player still in the lobby (no room yet) is not considered ended;
    /// used to drop gameplay messages once a match is over.
    pub(super) fn match_ended_for_player(&self, player_id: PlayerId) -> bool {
        self.room_manager
            .room_id_for_player(player_id)
            .and_then(|room_id| self.room_manager.with_match(room_id, |m| m.is_ended()))
            .unwrap_or(false)
    }

    fn match_already_ended(&self, room_id: RoomId) -> bool {
        self.room_manager.with_match(room_id, |m| m.is_ended()).unwrap_or(true)
    }

    pub(super) fn send_weapon_state(&self, player_id: PlayerId, weapon: crate::world::WeaponStateSnapshot) {
        self.broadcast.send_to_player(
            player_id,
            ServerMessage::WeaponState {
                player_id,
                weapon_type: weapon.weapon_type,
                ammo_in_magazine: weapon.ammo_in_magazine,
                magazine_size: weapon.magazine_size,
                reloading: weapon.reloading,
            },
        );
    }

    /// Credits `attacker_id` with one kill in its room's `Match` and ends
    /// the match via `kill_target` if this was the kill that reached it.
    pub(super) async fn credit_match_kill_and_maybe_end(&self, room_id: RoomId, attacker_id: PlayerId) {
        let should_end = self
            .room_manager
            .with_match(room_id, |m| {
                m.add_kill(attacker_id);
                m.check_kill_target()
            })
            .unwrap_or(false);
        if should_end {
            self.end_match(room_id, MatchEndReason::KillTarget).await;
        }
    }

    /// Ends `room_id`'s match if it isn't already ended, and broadcasts
    /// `match:ended`. Idempotent: a room whose match already ended is a
    /// no-op, which is what makes late-tick event handling safe (§9).
    pub(super) async fn end_match(&self, room_id: RoomId, reason: MatchEndReason) {
        let ended_now = self.room_manager.with_match(room_id, |m| m.end_match(reason)).unwrap_or(false);
        if !ended_now {
            return;
        }
        let (winners, final_scores) = self
            .room_manager
            .with_match(room_id, |m| (m.winners(), m.scores_snapshot()))
            .unwrap_or((Vec::new(), HashMap::new()));
        self.broadcast.broadcast_room(room_id, ServerMessage::MatchEnded { winners, final_scores, reason }, None);

        let counter = match reason {
            MatchEndReason::KillTarget => &self.metrics.matches_ended_kill_target,
            MatchEndReason::TimeLimit => &self.metrics.matches_ended_time_limit,
            MatchEndReason::Manual => &self.metrics.matches_ended_manual,
        };
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    /// Dispatches a drained [`WorldEvent`] to the matching broadcast. Called
    /// by the sim loop after each `World::step`.
    pub async fn handle_world_event(&self, event: WorldEvent) {
        match event {
            WorldEvent::Hit(hit) => self.handle_hit(hit).await,
            WorldEvent::Respawn(r) => self.handle_respawn(r).await,
            WorldEvent::ReloadComplete(r) => self.handle_reload_complete(r).await,
            WorldEvent::WeaponRespawn(w) => self.handle_weapon_respawn(w).await,
            WorldEvent::RollEnd(r) => self.handle_roll_end(r).await,
        }
    }

    async fn handle_hit(&self, hit: crate::world::events::HitEvent) {
        let Some(room_id) = self.room_manager.room_id_for_player(hit.victim_id) else {
            return;
        };
        if self.match_already_ended(room_id) {
            return;
        }

        self.broadcast.broadcast_room(
            room_id,
            ServerMessage::PlayerDamaged {
                victim_id: hit.victim_id,
                attacker_id: hit.attacker_id,
                damage: hit.damage,
                new_health: hit.new_health,
                projectile_id: hit.projectile_id,
            },
            None,
        );
        self.broadcast.send_to_player(
            hit.attacker_id,
            ServerMessage::HitConfirmed {
                victim_id: hit.victim_id,
                damage: hit.damage,
                projectile_id: hit.projectile_id,
            },
        );

        if !hit.killed {
            return;
        }
        self.broadcast.broadcast_room(
            room_id,
            ServerMessage::PlayerDeath { victim_id: hit.victim_id, attacker_id: hit.attacker_id },
            None,
        );

        if hit.attacker_id == hit.victim_id {
            return;
        }
        let (killer_kills, killer_xp) = self
            .world
            .read()
            .await
            .get_player_state(hit.attacker_id)
            .map(|p| (p.kills, p.xp))
            .unwrap_or((0, 0));
        self.broadcast.broadcast_room(
            room_id,
            ServerMessage::PlayerKillCredit {
                killer_id: hit.attacker_id,
                victim_id: hit.victim_id,
                killer_kills,
                killer_xp,
            },
            None,
        );
        self.credit_match_kill_and_maybe_end(room_id, hit.attacker_id).await;
    }

    async fn handle_respawn(&self, r: crate::world::events::RespawnEvent) {
        let Some(room_id) = self.room_manager.room_id_for_player(r.player_id) else {
            return;
        };
        if self.match_already_ended(room_id) {
            return;
        }
        self.broadcast.broadcast_room(
            room_id,
            ServerMessage::PlayerRespawn { player_id: r.player_id, position: r.position, health: r.health },
            None,
        );
    }

    async fn handle_reload_complete(&self, r: crate::world::events::ReloadCompleteEvent) {
        if self.match_ended_for_player(r.player_id) {
            return;
        }
        if let Some(weapon) = self.world.read().await.get_weapon_state(r.player_id) {
            self.send_weapon_state(r.player_id, weapon);
        }
    }

    async fn handle_weapon_respawn(&self, w: crate::world::events::WeaponRespawnEvent) {
        for room_id in self.room_manager.all_room_ids() {
            if self.match_already_ended(room_id) {
                continue;
            }
            self.broadcast.broadcast_room(
                room_id,
                ServerMessage::WeaponRespawned { crate_id: w.crate_id, weapon_type: w.weapon_type, position: w.position },
                None,
            );
        }
    }

    async fn handle_roll_end(&self, r: crate::world::events::RollEndEvent) {
        let Some(room_id) = self.room_manager.room_id_for_player(r.player_id) else {
            return;
        };
        if self.match_already_ended(room_id) {
            return;
        }
        self.broadcast.broadcast_room(room_id, ServerMessage::RollEnd { player_id: r.player_id }, None);
    }

    /// Prunes rooms whose match ended more than `grace` ago and are still
    /// occupying memory because their members never disconnected. Run
    /// periodically by the scheduler's room-cleanup loop, independent of
    /// the sim and match-timer loops.
    pub fn sweep_rooms(&self, now: Instant, grace: Duration) {
        let pruned = self.room_manager.prune_ended_rooms(now, grace);
        if !pruned.is_empty() {
            self.metrics
                .active_rooms
                .fetch_sub(pruned.len() as u64, std::sync::atomic::Ordering::Relaxed);
            info!(count = pruned.len(), "pruned ended rooms past grace period");
        }
    }

    /// Checks every room's match-timer state: ends the match on time-limit
    /// expiry, otherwise broadcasts the periodic `match:timer` tick.
    pub async fn tick_match_timers(&self, now: Instant) {
        for room_id in self.room_manager.all_room_ids() {
            self.tick_match_timer(room_id, now).await;
        }
    }

    async fn tick_match_timer(&self, room_id: RoomId, now: Instant) {
        enum Outcome {
            NotRunning,
            TimeUp,
            Tick(u64, HashMap<PlayerId, u32>),
        }

        let outcome = self.room_manager.with_match(room_id, |m| {
            if m.phase() != MatchPhase::Running {
                Outcome::NotRunning
            } else if m.elapsed_exceeded(now) {
                Outcome::TimeUp
            } else {
                Outcome::Tick(m.remaining_seconds(now), m.scores_snapshot())
            }
        });

        match outcome {
            None | Some(Outcome::NotRunning) => {}
            Some(Outcome::TimeUp) => self.end_match(room_id, MatchEndReason::TimeLimit).await,
            Some(Outcome::Tick(remaining_seconds, scores)) => {
                self.broadcast.broadcast_room(room_id, ServerMessage::MatchTimer { remaining_seconds, scores }, None);
            }
        }
    }

    /// One sim-loop tick: steps the World, drains and dispatches the events
    /// it produced, then broadcasts `player:move`/`projectile:*` per room.
    pub async fn tick_simulation(&self, dt: f64, now: Instant, events: &mut mpsc::UnboundedReceiver<WorldEvent>) {
        {
            let mut world = self.world.write().await;
            world.step(dt, now);
        }
        while let Ok(event) = events.try_recv() {
            self.handle_world_event(event).await;
        }
        self.broadcast_room_state(now).await;
    }

    async fn broadcast_room_state(&self, now: Instant) {
        let players = self.world.read().await.get_all_player_states();
        let player_by_id: HashMap<PlayerId, crate::world::player::PlayerStateSnapshot> =
            players.into_iter().map(|p| (p.id, p)).collect();

        for room_id in self.room_manager.all_room_ids() {
            if self.match_already_ended(room_id) {
                continue;
            }
            let members = self.room_manager.room_member_ids(room_id);
            let room_players: Vec<_> = members.iter().filter_map(|id| player_by_id.get(id).copied()).collect();
            for &member in &members {
                self.broadcast.broadcast_player_move(member, &room_players, now);
            }
            self.broadcast_room_projectiles(room_id).await;
        }
    }

    // Accessors used by `message_router` and the `websocket` transport layer.

    pub(crate) fn connections(&self) -> &Arc<Connections> {
        &self.connections
    }

    pub(crate) fn room_manager(&self) -> &Arc<RoomManager> {
        &self.room_manager
    }

    pub(crate) fn world(&self) -> &RwLock<World> {
        &self.world
    }

    pub(crate) fn broadcast(&self) -> &BroadcastHelper {
        &self.broadcast
    }

    pub(crate) fn schema_validator(&self) -> &Arc<SchemaValidator> {
        &self.schema_validator
    }

    pub(crate) fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }
}
