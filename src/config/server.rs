use serde::{Deserialize, Serialize};

/// Room, match and scheduler tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Players per room; the Room Manager finalizes a room once this many
    /// players have been paired into it.
    pub room_capacity: usize,
    /// Sim-loop cadence, 20 Hz by default (§4.7).
    pub sim_tick_hz: u32,
    /// Match-timer loop cadence, 1 Hz by default (§4.7).
    pub timer_tick_hz: u32,
    /// Kills required to end a match via `kill_target` (§4.3).
    pub default_kill_target: u32,
    /// Match duration in seconds before `time_limit` end (§4.3).
    pub default_time_limit_secs: u64,
    /// Snapshot cadence for the Delta Tracker, default 1s (§4.6).
    pub snapshot_interval_ms: u64,
    /// Capacity of each connection's bounded outbound queue (§4.1, §5).
    pub outbound_queue_capacity: usize,
    /// Euclidean pickup radius in pixels for `weapon:pickup_attempt` (§9).
    pub pickup_radius_px: f64,
    /// How often the room-cleanup sweep runs.
    pub room_cleanup_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            room_capacity: 2,
            sim_tick_hz: 20,
            timer_tick_hz: 1,
            default_kill_target: 10,
            default_time_limit_secs: 420,
            snapshot_interval_ms: 1000,
            outbound_queue_capacity: 256,
            pickup_radius_px: 32.0,
            room_cleanup_interval_secs: 30,
        }
    }
}
