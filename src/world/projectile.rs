use tokio::time::Instant;

use crate::protocol::{PlayerId, ProjectileId, Vec2};

/// Created by `PlayerShoot`; destroyed on hit, out-of-bounds, or ttl expiry
/// (§3).
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub damage: f64,
    pub(crate) spawned_at: Instant,
    pub(crate) ttl: std::time::Duration,
}

impl Projectile {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.spawned_at) >= self.ttl
    }

    pub fn is_out_of_bounds(&self, arena_width: f64, arena_height: f64) -> bool {
        self.position.x < 0.0
            || self.position.y < 0.0
            || self.position.x > arena_width
            || self.position.y > arena_height
    }
}
