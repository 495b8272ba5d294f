use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::match_state::Match;
use crate::protocol::{PlayerId, RoomId};

/// A room and its match. The simulation itself lives in a single
/// process-wide `World` owned by the server, not per room; a room is purely
/// a membership/scoring/broadcast-fanout grouping over that shared World.
pub struct Room {
    pub id: RoomId,
    pub members: Vec<PlayerId>,
    pub game_match: Mutex<Match>,
}

impl Room {
    fn new(id: RoomId, members: Vec<PlayerId>, kill_target: u32, time_limit: Duration) -> Self {
        Self {
            id,
            members,
            game_match: Mutex::new(Match::new(kill_target, time_limit)),
        }
    }
}

/// Tracks which room each player belongs to and fans rooms in/out of
/// existence as they fill and empty. Delivery itself — reaching a player's
/// outbound queue — is a separate concern owned by the connection registry;
/// this type only answers "who is in which room."
///
/// Pairing uses a single `current_pending` slot rather than a queue of
/// partially-filled rooms: with the default room capacity of 2, a room is
/// finalized the instant a second player joins, so there is never more than
/// one not-yet-full room to track at a time. First-fit to the oldest
/// not-yet-full room falls out for free.
pub struct RoomManager {
    room_capacity: usize,
    kill_target: u32,
    time_limit: Duration,
    current_pending: Mutex<Option<RoomId>>,
    rooms: DashMap<RoomId, Room>,
    player_room: DashMap<PlayerId, RoomId>,
    lobby: DashMap<PlayerId, ()>,
}

impl RoomManager {
    pub fn new(room_capacity: usize, kill_target: u32, time_limit: Duration) -> Self {
        Self {
            room_capacity: room_capacity.max(1),
            kill_target,
            time_limit,
            current_pending: Mutex::new(None),
            rooms: DashMap::new(),
            player_room: DashMap::new(),
            lobby: DashMap::new(),
        }
    }

    /// Assigns `player_id` to the pending room, creating one if needed.
    /// Returns `Some(room_id)` the instant the room reaches capacity and is
    /// finalized (its match is started at `now`); otherwise the player is
    /// parked in the lobby and `None` is returned. The caller is
    /// responsible for adding the player to the shared `World`.
    pub fn add_player(&self, player_id: PlayerId, now: Instant) -> Option<RoomId> {
        let mut pending = self.current_pending.lock().unwrap();

        let room_id = match *pending {
            Some(id) => id,
            None => {
                let id = RoomId::new_v4();
                self.rooms
                    .insert(id, Room::new(id, Vec::new(), self.kill_target, self.time_limit));
                *pending = Some(id);
                id
            }
        };

        self.lobby.insert(player_id, ());
        let mut finalized = false;
        if let Some(mut room) = self.rooms.get_mut(&room_id) {
            room.members.push(player_id);
            self.player_room.insert(player_id, room_id);
            if room.members.len() >= self.room_capacity {
                room.game_match.lock().unwrap().start(now);
                finalized = true;
            }
        }

        if finalized {
            let members = self.rooms.get(&room_id).map(|r| r.members.clone()).unwrap_or_default();
            for id in members {
                self.lobby.remove(&id);
            }
            *pending = None;
            Some(room_id)
        } else {
            None
        }
    }

    /// Removes `player_id` from its room or the lobby. If this empties the
    /// room, the room (and its match) is destroyed and `true` is returned so
    /// the caller can keep a room-count metric accurate. The caller is
    /// responsible for removing the player from the shared `World`.
    pub fn remove_player(&self, player_id: PlayerId) -> bool {
        self.lobby.remove(&player_id);
        let Some((_, room_id)) = self.player_room.remove(&player_id) else {
            return false;
        };

        let mut became_empty = false;
        if let Some(mut room) = self.rooms.get_mut(&room_id) {
            room.members.retain(|id| *id != player_id);
            became_empty = room.members.is_empty();
        }
        if became_empty {
            self.rooms.remove(&room_id);
        }

        let mut pending = self.current_pending.lock().unwrap();
        if *pending == Some(room_id) && became_empty {
            *pending = None;
        }

        became_empty
    }

    pub fn room_id_for_player(&self, player_id: PlayerId) -> Option<RoomId> {
        self.player_room.get(&player_id).map(|r| *r)
    }

    pub fn room_member_ids(&self, room_id: RoomId) -> Vec<PlayerId> {
        self.rooms
            .get(&room_id)
            .map(|r| r.members.clone())
            .unwrap_or_default()
    }

    pub fn is_in_lobby(&self, player_id: PlayerId) -> bool {
        self.lobby.contains_key(&player_id)
    }

    pub fn all_room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|r| *r.key()).collect()
    }

    /// Runs `f` with the room's match locked, returning its result. `None`
    /// if the room no longer exists (e.g. raced with disconnect cleanup).
    pub fn with_match<R>(&self, room_id: RoomId, f: impl FnOnce(&mut Match) -> R) -> Option<R> {
        let room = self.rooms.get(&room_id)?;
        let mut game_match = room.game_match.lock().unwrap();
        Some(f(&mut game_match))
    }

    /// Drops rooms whose match ended more than `grace` ago. A room is
    /// already torn down the instant its last member disconnects
    /// (`remove_player`); this sweep only catches the remaining case, a
    /// room whose match ended via kill-target/time-limit while its members
    /// stay connected without ever being unregistered. Returns the pruned
    /// room ids so the caller can adjust metrics/logging.
    ///
    /// `player_room` entries for a pruned room's members are left in place:
    /// a still-connected client whose room was just pruned keeps resolving
    /// to a room id that no longer exists in `rooms`, so `room_member_ids`
    /// returns empty and nothing is ever broadcast to it. Its messages
    /// still mutate its own `World` state but reach no one.
    pub fn prune_ended_rooms(&self, now: Instant, grace: Duration) -> Vec<RoomId> {
        let stale: Vec<RoomId> = self
            .rooms
            .iter()
            .filter_map(|entry| {
                let game_match = entry.value().game_match.lock().unwrap();
                let ended_at = game_match.ended_at()?;
                (now.saturating_duration_since(ended_at) >= grace).then_some(*entry.key())
            })
            .collect();

        for room_id in &stale {
            self.rooms.remove(room_id);
        }

        let mut pending = self.current_pending.lock().unwrap();
        if let Some(pending_id) = *pending {
            if stale.contains(&pending_id) {
                *pending = None;
            }
        }

        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RoomManager {
        RoomManager::new(2, 10, Duration::from_secs(420))
    }

    #[test]
    fn room_finalizes_at_capacity() {
        let mgr = manager();
        let now = Instant::now();
        let a = PlayerId::new_v4();
        let b = PlayerId::new_v4();

        assert_eq!(mgr.add_player(a, now), None);
        assert!(mgr.is_in_lobby(a));

        let room_id = mgr.add_player(b, now).expect("room should finalize");
        assert!(!mgr.is_in_lobby(a));
        assert!(!mgr.is_in_lobby(b));
        assert_eq!(mgr.room_id_for_player(a), Some(room_id));
        assert_eq!(mgr.room_id_for_player(b), Some(room_id));

        let members = mgr.room_member_ids(room_id);
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn a_third_player_starts_a_new_room() {
        let mgr = manager();
        let now = Instant::now();
        let a = PlayerId::new_v4();
        let b = PlayerId::new_v4();
        let c = PlayerId::new_v4();

        let room1 = mgr.add_player(a, now).or(mgr.add_player(b, now)).unwrap();
        assert_eq!(mgr.add_player(c, now), None);
        assert_ne!(mgr.room_id_for_player(c), Some(room1));
    }

    #[test]
    fn removing_a_player_empties_and_destroys_the_room() {
        let mgr = manager();
        let now = Instant::now();
        let a = PlayerId::new_v4();
        let b = PlayerId::new_v4();
        let room_id = mgr.add_player(a, now).or(mgr.add_player(b, now)).unwrap();

        mgr.remove_player(a);
        mgr.remove_player(b);
        assert!(mgr.room_member_ids(room_id).is_empty());
        assert_eq!(mgr.room_id_for_player(a), None);
    }

    #[test]
    fn prune_removes_rooms_ended_past_grace() {
        let mgr = manager();
        let now = Instant::now();
        let a = PlayerId::new_v4();
        let b = PlayerId::new_v4();
        let room_id = mgr.add_player(a, now).or(mgr.add_player(b, now)).unwrap();

        mgr.with_match(room_id, |m| m.end_match(crate::protocol::MatchEndReason::Manual));

        assert!(mgr.prune_ended_rooms(now, Duration::from_secs(60)).is_empty());
        assert_eq!(mgr.room_member_ids(room_id).len(), 2);

        let later = now + Duration::from_secs(61);
        let pruned = mgr.prune_ended_rooms(later, Duration::from_secs(60));
        assert_eq!(pruned, vec![room_id]);
        assert!(mgr.room_member_ids(room_id).is_empty());
    }

    #[test]
    fn prune_ignores_rooms_with_no_match_in_progress() {
        let mgr = manager();
        let now = Instant::now();
        let a = PlayerId::new_v4();
        mgr.add_player(a, now);
        assert!(mgr.prune_ended_rooms(now + Duration::from_secs(600), Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn removing_from_lobby_leaves_no_trace() {
        let mgr = manager();
        let now = Instant::now();
        let a = PlayerId::new_v4();
        mgr.add_player(a, now);
        assert!(mgr.is_in_lobby(a));
        mgr.remove_player(a);
        assert!(!mgr.is_in_lobby(a));
    }
}
