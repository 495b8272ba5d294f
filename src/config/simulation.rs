use serde::{Deserialize, Serialize};

/// World/simulation tunables: arena bounds and weapon timings.
///
/// The exact balance numbers (damage, fire rate) are deliberately out of
/// scope for the core per the spec's purpose section; this struct carries
/// just enough of a constants table for the World to be runnable, not a
/// rules engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub arena_width: f64,
    pub arena_height: f64,
    pub player_max_health: f64,
    pub player_move_speed: f64,
    pub player_sprint_multiplier: f64,
    pub respawn_delay_ms: u64,
    pub respawn_invulnerability_ms: u64,
    pub health_regen_delay_ms: u64,
    pub health_regen_per_sec: f64,
    pub weapon_respawn_delay_ms: u64,
    pub default_weapon_fire_cooldown_ms: u64,
    pub default_weapon_reload_ms: u64,
    pub default_weapon_magazine_size: u32,
    pub default_weapon_damage: f64,
    pub default_projectile_speed: f64,
    pub default_projectile_ttl_ms: u64,
    pub kill_xp_reward: u32,
    pub roll_duration_ms: u64,
    pub roll_speed: f64,
    pub melee_range_px: f64,
    pub melee_damage: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            arena_width: 1920.0,
            arena_height: 1080.0,
            player_max_health: 100.0,
            player_move_speed: 220.0,
            player_sprint_multiplier: 1.6,
            respawn_delay_ms: 3000,
            respawn_invulnerability_ms: 1500,
            health_regen_delay_ms: 5000,
            health_regen_per_sec: 8.0,
            weapon_respawn_delay_ms: 15_000,
            default_weapon_fire_cooldown_ms: 250,
            default_weapon_reload_ms: 1500,
            default_weapon_magazine_size: 12,
            default_weapon_damage: 18.0,
            default_projectile_speed: 900.0,
            default_projectile_ttl_ms: 1200,
            kill_xp_reward: 100,
            roll_duration_ms: 400,
            roll_speed: 520.0,
            melee_range_px: 48.0,
            melee_damage: 35.0,
        }
    }
}
