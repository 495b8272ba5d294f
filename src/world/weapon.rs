use std::collections::HashMap;
use std::time::Duration;

use crate::config::SimulationConfig;
use crate::protocol::{CrateId, Vec2, WeaponType};

/// Per-weapon timing/damage constants. Deliberately a small, declarative
/// table rather than a rules engine: the exact balance numbers are out of
/// the core's scope per the spec's purpose section.
#[derive(Debug, Clone, Copy)]
pub struct WeaponDef {
    pub damage: f64,
    pub fire_cooldown: Duration,
    pub magazine_size: u32,
    pub reload_time: Duration,
    pub projectile_speed: f64,
    pub projectile_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct WeaponTable(HashMap<WeaponType, WeaponDef>);

impl WeaponTable {
    pub fn from_config(cfg: &SimulationConfig) -> Self {
        let base = WeaponDef {
            damage: cfg.default_weapon_damage,
            fire_cooldown: Duration::from_millis(cfg.default_weapon_fire_cooldown_ms),
            magazine_size: cfg.default_weapon_magazine_size,
            reload_time: Duration::from_millis(cfg.default_weapon_reload_ms),
            projectile_speed: cfg.default_projectile_speed,
            projectile_ttl: Duration::from_millis(cfg.default_projectile_ttl_ms),
        };

        let mut table = HashMap::new();
        table.insert(WeaponType::Pistol, base);
        table.insert(
            WeaponType::Uzi,
            WeaponDef {
                damage: base.damage * 0.6,
                fire_cooldown: base.fire_cooldown / 3,
                magazine_size: base.magazine_size * 2,
                ..base
            },
        );
        table.insert(
            WeaponType::Shotgun,
            WeaponDef {
                damage: base.damage * 2.2,
                fire_cooldown: base.fire_cooldown * 3,
                magazine_size: (base.magazine_size / 2).max(1),
                projectile_ttl: base.projectile_ttl / 2,
                ..base
            },
        );
        table.insert(
            WeaponType::Rifle,
            WeaponDef {
                damage: base.damage * 1.3,
                projectile_speed: base.projectile_speed * 1.4,
                projectile_ttl: base.projectile_ttl * 2,
                ..base
            },
        );
        Self(table)
    }

    pub fn get(&self, weapon_type: WeaponType) -> WeaponDef {
        self.0
            .get(&weapon_type)
            .copied()
            .unwrap_or(WeaponDef {
                damage: 10.0,
                fire_cooldown: Duration::from_millis(250),
                magazine_size: 10,
                reload_time: Duration::from_millis(1500),
                projectile_speed: 800.0,
                projectile_ttl: Duration::from_millis(1000),
            })
    }
}

/// A fixed-position pickup. The set of crates is fixed at world-init;
/// `is_available` toggles on pickup/respawn (§3).
#[derive(Debug, Clone)]
pub struct WeaponCrate {
    pub id: CrateId,
    pub weapon_type: WeaponType,
    pub position: Vec2,
    pub is_available: bool,
    pub respawn_at: Option<tokio::time::Instant>,
}

impl WeaponCrate {
    pub fn new(weapon_type: WeaponType, position: Vec2) -> Self {
        Self {
            id: CrateId::new_v4(),
            weapon_type,
            position,
            is_available: true,
            respawn_at: None,
        }
    }
}
