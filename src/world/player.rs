use tokio::time::Instant;

use crate::protocol::{PlayerId, PlayerInput, Vec2, WeaponType};

use super::weapon::WeaponDef;

/// Live ammo/reload state for a player's current weapon (§4.4).
#[derive(Debug, Clone)]
pub struct WeaponState {
    pub weapon_type: WeaponType,
    pub ammo_in_magazine: u32,
    pub magazine_size: u32,
    pub(crate) reload_finishes_at: Option<Instant>,
    pub(crate) last_shot_at: Option<Instant>,
}

impl WeaponState {
    pub fn new(weapon_type: WeaponType, def: WeaponDef) -> Self {
        Self {
            weapon_type,
            ammo_in_magazine: def.magazine_size,
            magazine_size: def.magazine_size,
            reload_finishes_at: None,
            last_shot_at: None,
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_finishes_at.is_some()
    }
}

/// The simulation record for a connected player (§3). Persists across
/// death/respawn; destroyed when the player disconnects.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim_angle: f64,
    pub health: f64,
    pub(crate) death_time: Option<Instant>,
    pub is_invulnerable: bool,
    pub(crate) invulnerable_until: Option<Instant>,
    pub rolling: bool,
    pub(crate) rolling_until: Option<Instant>,
    pub is_regenerating_health: bool,
    pub(crate) regen_eligible_at: Option<Instant>,
    pub kills: u32,
    pub deaths: u32,
    pub xp: u32,
    pub input: PlayerInput,
    pub weapon: WeaponState,
    pub(crate) respawn_at: Option<Instant>,
}

impl PlayerState {
    pub fn new(id: PlayerId, position: Vec2, max_health: f64, weapon: WeaponState) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            aim_angle: 0.0,
            health: max_health,
            death_time: None,
            is_invulnerable: false,
            invulnerable_until: None,
            rolling: false,
            rolling_until: None,
            is_regenerating_health: false,
            regen_eligible_at: None,
            kills: 0,
            deaths: 0,
            xp: 0,
            input: PlayerInput::default(),
            weapon,
            respawn_at: None,
        }
    }

    /// Derived from `death_time` per §3: a player is alive iff they have no
    /// recorded time of death.
    pub fn is_alive(&self) -> bool {
        self.death_time.is_none()
    }
}

/// An outward-facing, immutable copy of a player's simulation state — what
/// the Delta Tracker diffs and what `GetPlayerState`/`GetAllPlayerStates`
/// return (§4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStateSnapshot {
    pub id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim_angle: f64,
    pub health: f64,
    pub is_alive: bool,
    pub is_invulnerable: bool,
    pub rolling: bool,
    pub is_regenerating_health: bool,
    pub kills: u32,
    pub deaths: u32,
    pub xp: u32,
}

impl From<&PlayerState> for PlayerStateSnapshot {
    fn from(p: &PlayerState) -> Self {
        Self {
            id: p.id,
            position: p.position,
            velocity: p.velocity,
            aim_angle: p.aim_angle,
            health: p.health,
            is_alive: p.is_alive(),
            is_invulnerable: p.is_invulnerable,
            rolling: p.rolling,
            is_regenerating_health: p.is_regenerating_health,
            kills: p.kills,
            deaths: p.deaths,
            xp: p.xp,
        }
    }
}
