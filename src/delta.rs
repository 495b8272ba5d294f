use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

use crate::protocol::{CrateId, PlayerId, PlayerStateWire, ProjectileId};
use crate::world::player::PlayerStateSnapshot;

const POSITION_EPSILON: f64 = 0.1;
const VELOCITY_EPSILON: f64 = 0.1;
const AIM_ANGLE_EPSILON: f64 = 0.01;

struct ClientDeltaState {
    last_snapshot_at: Instant,
    last_player_states: HashMap<PlayerId, PlayerStateSnapshot>,
    last_projectile_ids: HashSet<ProjectileId>,
    last_crate_ids: HashSet<CrateId>,
    has_sent: bool,
}

impl ClientDeltaState {
    fn fresh(now: Instant) -> Self {
        Self {
            last_snapshot_at: now,
            last_player_states: HashMap::new(),
            last_projectile_ids: HashSet::new(),
            last_crate_ids: HashSet::new(),
            has_sent: false,
        }
    }
}

/// Returns `true` if `current` differs from `previous` by more than the
/// broadcast thresholds, i.e. it's worth including in a delta frame.
fn changed_beyond_threshold(previous: &PlayerStateSnapshot, current: &PlayerStateSnapshot) -> bool {
    (previous.position.x - current.position.x).abs() > POSITION_EPSILON
        || (previous.position.y - current.position.y).abs() > POSITION_EPSILON
        || (previous.velocity.x - current.velocity.x).abs() > VELOCITY_EPSILON
        || (previous.velocity.y - current.velocity.y).abs() > VELOCITY_EPSILON
        || (previous.aim_angle - current.aim_angle).abs() > AIM_ANGLE_EPSILON
        || previous.health != current.health
        || previous.is_alive != current.is_alive
        || previous.is_invulnerable != current.is_invulnerable
        || previous.rolling != current.rolling
        || previous.is_regenerating_health != current.is_regenerating_health
        || previous.kills != current.kills
        || previous.deaths != current.deaths
        || previous.xp != current.xp
}

fn wire_from_snapshot(s: &PlayerStateSnapshot) -> PlayerStateWire {
    PlayerStateWire {
        id: s.id,
        position: Some(s.position),
        velocity: Some(s.velocity),
        aim_angle: Some(s.aim_angle),
        health: Some(s.health),
        is_alive: Some(s.is_alive),
        is_invulnerable: Some(s.is_invulnerable),
        rolling: Some(s.rolling),
        is_regenerating_health: Some(s.is_regenerating_health),
        kills: Some(s.kills),
        deaths: Some(s.deaths),
        xp: Some(s.xp),
    }
}

/// Per-client snapshot/delta state for `player:move` broadcasts, plus the
/// add/remove id diffing used for `projectile:spawn`/`despawn` and
/// `weapon:spawned`/`respawned`. One instance is shared by the whole
/// server; state is keyed per connected player and created lazily on first
/// broadcast.
pub struct DeltaTracker {
    clients: RwLock<HashMap<PlayerId, ClientDeltaState>>,
    snapshot_interval: Duration,
}

impl DeltaTracker {
    pub fn new(snapshot_interval: Duration) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            snapshot_interval,
        }
    }

    pub fn remove_client(&self, player_id: PlayerId) {
        self.clients.write().unwrap().remove(&player_id);
    }

    /// Builds the `player:move` payload for `recipient`: a full snapshot of
    /// every player on the first send or once the snapshot interval
    /// elapses, otherwise only the players that changed beyond threshold.
    /// Returns `(players, is_snapshot)`; `players` is empty and
    /// `is_snapshot` is `false` when there is nothing new to report.
    pub fn player_move_payload(
        &self,
        recipient: PlayerId,
        current: &[PlayerStateSnapshot],
        now: Instant,
    ) -> (Vec<PlayerStateWire>, bool) {
        let mut clients = self.clients.write().unwrap();
        let state = clients
            .entry(recipient)
            .or_insert_with(|| ClientDeltaState::fresh(now));

        let need_snapshot =
            !state.has_sent || now.saturating_duration_since(state.last_snapshot_at) >= self.snapshot_interval;

        let included: Vec<&PlayerStateSnapshot> = if need_snapshot {
            current.iter().collect()
        } else {
            current
                .iter()
                .filter(|c| {
                    state
                        .last_player_states
                        .get(&c.id)
                        .is_none_or(|prev| changed_beyond_threshold(prev, c))
                })
                .collect()
        };
        let wire = included.iter().map(|s| wire_from_snapshot(s)).collect::<Vec<_>>();

        if need_snapshot {
            state.last_snapshot_at = now;
        }
        state.has_sent = true;
        // Baseline only advances for players actually in this frame
        // (all of them on a snapshot); a player excluded for being below
        // threshold keeps its old baseline so sub-threshold drift
        // accumulates against the last *sent* state, not the last
        // *observed* one.
        for s in included {
            state.last_player_states.insert(s.id, *s);
        }

        (wire, need_snapshot)
    }

    /// Diffs `current` projectile ids against what `recipient` was last
    /// told about, returning `(added, removed)`.
    pub fn projectile_diff(
        &self,
        recipient: PlayerId,
        current: &HashSet<ProjectileId>,
    ) -> (Vec<ProjectileId>, Vec<ProjectileId>) {
        let mut clients = self.clients.write().unwrap();
        let state = clients
            .entry(recipient)
            .or_insert_with(|| ClientDeltaState::fresh(Instant::now()));

        let added = current
            .difference(&state.last_projectile_ids)
            .copied()
            .collect();
        let removed = state
            .last_projectile_ids
            .difference(current)
            .copied()
            .collect();
        state.last_projectile_ids = current.clone();
        (added, removed)
    }

    pub fn crate_diff(
        &self,
        recipient: PlayerId,
        current: &HashSet<CrateId>,
    ) -> (Vec<CrateId>, Vec<CrateId>) {
        let mut clients = self.clients.write().unwrap();
        let state = clients
            .entry(recipient)
            .or_insert_with(|| ClientDeltaState::fresh(Instant::now()));

        let added = current.difference(&state.last_crate_ids).copied().collect();
        let removed = state.last_crate_ids.difference(current).copied().collect();
        state.last_crate_ids = current.clone();
        (added, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Vec2;

    fn snapshot(id: PlayerId, x: f64) -> PlayerStateSnapshot {
        PlayerStateSnapshot {
            id,
            position: Vec2::new(x, 0.0),
            velocity: Vec2::ZERO,
            aim_angle: 0.0,
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

    #[test]
    fn first_send_is_always_a_full_snapshot() {
        let tracker = DeltaTracker::new(Duration::from_secs(1));
        let id = PlayerId::new_v4();
        let recipient = PlayerId::new_v4();
        let now = Instant::now();
        let (players, is_snapshot) =
            tracker.player_move_payload(recipient, &[snapshot(id, 0.0)], now);
        assert!(is_snapshot);
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn small_movement_below_threshold_is_not_included_in_a_delta() {
        let tracker = DeltaTracker::new(Duration::from_secs(1));
        let id = PlayerId::new_v4();
        let recipient = PlayerId::new_v4();
        let t0 = Instant::now();
        tracker.player_move_payload(recipient, &[snapshot(id, 0.0)], t0);

        let t1 = t0 + Duration::from_millis(10);
        let (players, is_snapshot) =
            tracker.player_move_payload(recipient, &[snapshot(id, 0.05)], t1);
        assert!(!is_snapshot);
        assert!(players.is_empty());
    }

    #[test]
    fn sub_threshold_drift_accumulates_against_the_last_sent_baseline() {
        let tracker = DeltaTracker::new(Duration::from_secs(1));
        let id = PlayerId::new_v4();
        let recipient = PlayerId::new_v4();
        let t0 = Instant::now();
        tracker.player_move_payload(recipient, &[snapshot(id, 0.0)], t0);

        // Each step moves by less than the threshold, but the baseline
        // must stay pinned at 0.0 (the last *sent* position) for omitted
        // frames, so the third step's cumulative drift crosses it.
        let t1 = t0 + Duration::from_millis(10);
        let (players, _) = tracker.player_move_payload(recipient, &[snapshot(id, 0.05)], t1);
        assert!(players.is_empty());

        let t2 = t1 + Duration::from_millis(10);
        let (players, _) = tracker.player_move_payload(recipient, &[snapshot(id, 0.09)], t2);
        assert!(players.is_empty());

        let t3 = t2 + Duration::from_millis(10);
        let (players, _) = tracker.player_move_payload(recipient, &[snapshot(id, 0.13)], t3);
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn movement_past_threshold_is_included_in_a_delta() {
        let tracker = DeltaTracker::new(Duration::from_secs(1));
        let id = PlayerId::new_v4();
        let recipient = PlayerId::new_v4();
        let t0 = Instant::now();
        tracker.player_move_payload(recipient, &[snapshot(id, 0.0)], t0);

        let t1 = t0 + Duration::from_millis(10);
        let (players, is_snapshot) =
            tracker.player_move_payload(recipient, &[snapshot(id, 5.0)], t1);
        assert!(!is_snapshot);
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn snapshot_interval_forces_a_full_resend() {
        let tracker = DeltaTracker::new(Duration::from_millis(100));
        let id = PlayerId::new_v4();
        let recipient = PlayerId::new_v4();
        let t0 = Instant::now();
        tracker.player_move_payload(recipient, &[snapshot(id, 0.0)], t0);

        let t1 = t0 + Duration::from_millis(200);
        let (players, is_snapshot) =
            tracker.player_move_payload(recipient, &[snapshot(id, 0.0)], t1);
        assert!(is_snapshot);
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn projectile_diff_reports_additions_and_removals() {
        let tracker = DeltaTracker::new(Duration::from_secs(1));
        let recipient = PlayerId::new_v4();
        let p1 = ProjectileId::new_v4();
        let p2 = ProjectileId::new_v4();

        let first: HashSet<_> = [p1].into_iter().collect();
        let (added, removed) = tracker.projectile_diff(recipient, &first);
        assert_eq!(added, vec![p1]);
        assert!(removed.is_empty());

        let second: HashSet<_> = [p2].into_iter().collect();
        let (added, removed) = tracker.projectile_diff(recipient, &second);
        assert_eq!(added, vec![p2]);
        assert_eq!(removed, vec![p1]);
    }

    #[test]
    fn remove_client_drops_its_state() {
        let tracker = DeltaTracker::new(Duration::from_secs(1));
        let id = PlayerId::new_v4();
        let recipient = PlayerId::new_v4();
        tracker.player_move_payload(recipient, &[snapshot(id, 0.0)], Instant::now());
        tracker.remove_client(recipient);
        let (_players, is_snapshot) =
            tracker.player_move_payload(recipient, &[snapshot(id, 0.0)], Instant::now());
        assert!(is_snapshot);
    }
}
