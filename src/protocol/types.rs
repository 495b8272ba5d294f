use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;
pub type RoomId = Uuid;
pub type ProjectileId = Uuid;
pub type CrateId = Uuid;

/// A 2D point or vector. All fields are `f64`; every instance that crosses
/// the wire is sanitized per §4.6 before being placed in an outgoing
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(&self, other: Vec2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Raw directional input submitted via `input:state` (§3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub aim_angle: f64,
    pub is_sprinting: bool,
}

impl Default for PlayerInput {
    fn default() -> Self {
        Self {
            up: false,
            down: false,
            left: false,
            right: false,
            aim_angle: 0.0,
            is_sprinting: false,
        }
    }
}

/// Weapon identity; the balance numbers themselves live in
/// [`crate::config::SimulationConfig`] / [`crate::world::weapon::WeaponTable`]
/// and are deliberately out of the core's scope per the spec's purpose
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    Pistol,
    Uzi,
    Shotgun,
    Rifle,
}

/// Failure reasons for `player:shoot` → `shoot:failed{reason}` (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShootFailureReason {
    Reloading,
    EmptyMagazine,
    Cooldown,
    Dead,
    NoWeapon,
}

/// `Match.endReason` (§3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchEndReason {
    KillTarget,
    TimeLimit,
    Manual,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec2_distance_is_symmetric() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(a.distance_to(b), b.distance_to(a));
    }

    #[test]
    fn vec2_detects_non_finite() {
        assert!(!Vec2::new(f64::NAN, 0.0).is_finite());
        assert!(!Vec2::new(0.0, f64::INFINITY).is_finite());
        assert!(Vec2::new(1.0, 2.0).is_finite());
    }
}
