pub mod events;
pub mod player;
pub mod projectile;
pub mod weapon;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::RngExt;
use tokio::time::Instant;

use crate::config::SimulationConfig;
use crate::protocol::{
    CrateId, PlayerId, PlayerInput, ProjectileId, ShootFailureReason, Vec2, WeaponType,
};

use events::{
    HitEvent, ReloadCompleteEvent, RespawnEvent, RollEndEvent, WeaponRespawnEvent, WorldEvent,
    WorldEventSink,
};
use player::{PlayerState, PlayerStateSnapshot, WeaponState};
use projectile::Projectile;
use weapon::{WeaponCrate, WeaponTable};

/// Collision radius used for projectile-vs-player hit detection. Not part
/// of the balance table in [`SimulationConfig`] since it describes hitbox
/// geometry rather than a tunable weapon stat.
const PLAYER_HIT_RADIUS_PX: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShootOutcome {
    Spawned {
        projectile_id: ProjectileId,
        position: Vec2,
        velocity: Vec2,
    },
    Failed(ShootFailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStateSnapshot {
    pub weapon_type: WeaponType,
    pub ammo_in_magazine: u32,
    pub magazine_size: u32,
    pub reloading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSnapshot {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            position: p.position,
            velocity: p.velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrateSnapshot {
    pub id: CrateId,
    pub weapon_type: WeaponType,
    pub position: Vec2,
    pub is_available: bool,
}

impl From<&WeaponCrate> for CrateSnapshot {
    fn from(c: &WeaponCrate) -> Self {
        Self {
            id: c.id,
            weapon_type: c.weapon_type,
            position: c.position,
            is_available: c.is_available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickupOutcome {
    Confirmed { weapon_type: WeaponType },
    NotAvailable,
    UnknownCrate,
    UnknownPlayer,
}

struct DamageResult {
    new_health: f64,
    killed: bool,
}

/// The authoritative simulation for a single match: players, projectiles,
/// and weapon crates, advanced by fixed-step [`World::step`] calls driven
/// by the scheduler. Holds no networking state; state changes it can't
/// report back synchronously (hits, respawns, reload completion, weapon
/// respawns, roll expiry) go out through the [`WorldEventSink`] given at
/// construction.
pub struct World {
    config: Arc<SimulationConfig>,
    weapons: WeaponTable,
    events: Arc<dyn WorldEventSink>,
    players: HashMap<PlayerId, PlayerState>,
    projectiles: HashMap<ProjectileId, Projectile>,
    crates: HashMap<CrateId, WeaponCrate>,
}

impl World {
    pub fn new(config: Arc<SimulationConfig>, events: Arc<dyn WorldEventSink>) -> Self {
        let weapons = WeaponTable::from_config(&config);
        let mut world = Self {
            config,
            weapons,
            events,
            players: HashMap::new(),
            projectiles: HashMap::new(),
            crates: HashMap::new(),
        };
        world.spawn_default_crates();
        world
    }

    /// Places one crate of each non-starting weapon type at fixed points
    /// derived from the arena bounds. The starting pistol never needs a
    /// crate since every player spawns already holding one.
    fn spawn_default_crates(&mut self) {
        let w = self.config.arena_width;
        let h = self.config.arena_height;
        let placements = [
            (WeaponType::Uzi, Vec2::new(w * 0.25, h * 0.25)),
            (WeaponType::Shotgun, Vec2::new(w * 0.75, h * 0.25)),
            (WeaponType::Rifle, Vec2::new(w * 0.5, h * 0.75)),
        ];
        for (weapon_type, position) in placements {
            let c = WeaponCrate::new(weapon_type, position);
            self.crates.insert(c.id, c);
        }
    }

    fn random_spawn_position(&self) -> Vec2 {
        let mut rng = rand::rng();
        Vec2::new(
            rng.random_range(0.0..self.config.arena_width),
            rng.random_range(0.0..self.config.arena_height),
        )
    }

    pub fn add_player(&mut self, id: PlayerId) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }
        let weapon = WeaponState::new(WeaponType::Pistol, self.weapons.get(WeaponType::Pistol));
        let position = self.random_spawn_position();
        let state = PlayerState::new(id, position, self.config.player_max_health, weapon);
        self.players.insert(id, state);
        true
    }

    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.remove(&id);
        self.projectiles.retain(|_, p| p.owner_id != id);
    }

    pub fn update_player_input(&mut self, id: PlayerId, input: PlayerInput) -> bool {
        match self.players.get_mut(&id) {
            Some(p) if p.is_alive() && !p.rolling => {
                p.input = input;
                p.aim_angle = input.aim_angle;
                true
            }
            Some(p) if p.is_alive() => {
                // Still alive but mid-roll: aim is locked, facing direction isn't.
                p.input = input;
                true
            }
            _ => false,
        }
    }

    pub fn player_shoot(&mut self, id: PlayerId, aim_angle: f64, now: Instant) -> ShootOutcome {
        let Some(p) = self.players.get_mut(&id) else {
            return ShootOutcome::Failed(ShootFailureReason::NoWeapon);
        };
        if !p.is_alive() {
            return ShootOutcome::Failed(ShootFailureReason::Dead);
        }
        if p.weapon.is_reloading() {
            return ShootOutcome::Failed(ShootFailureReason::Reloading);
        }
        let def = self.weapons.get(p.weapon.weapon_type);
        if let Some(last_shot) = p.weapon.last_shot_at {
            if now.saturating_duration_since(last_shot) < def.fire_cooldown {
                return ShootOutcome::Failed(ShootFailureReason::Cooldown);
            }
        }
        if p.weapon.ammo_in_magazine == 0 {
            return ShootOutcome::Failed(ShootFailureReason::EmptyMagazine);
        }

        p.weapon.ammo_in_magazine -= 1;
        p.weapon.last_shot_at = Some(now);
        p.aim_angle = aim_angle;

        let velocity = Vec2::new(
            aim_angle.cos() * def.projectile_speed,
            aim_angle.sin() * def.projectile_speed,
        );
        let projectile = Projectile {
            id: ProjectileId::new_v4(),
            owner_id: id,
            position: p.position,
            velocity,
            damage: def.damage,
            spawned_at: now,
            ttl: def.projectile_ttl,
        };
        let projectile_id = projectile.id;
        let position = projectile.position;
        self.projectiles.insert(projectile_id, projectile);

        ShootOutcome::Spawned {
            projectile_id,
            position,
            velocity,
        }
    }

    pub fn player_reload(&mut self, id: PlayerId, now: Instant) -> bool {
        let Some(p) = self.players.get_mut(&id) else {
            return false;
        };
        if !p.is_alive() || p.weapon.is_reloading() {
            return false;
        }
        if p.weapon.ammo_in_magazine == p.weapon.magazine_size {
            return false;
        }
        let def = self.weapons.get(p.weapon.weapon_type);
        p.weapon.reload_finishes_at = Some(now + def.reload_time);
        true
    }

    /// Returns the ids of every other living, non-invulnerable player within
    /// melee range of `id`'s facing direction, along with whether the blow
    /// killed them. Resolved synchronously (not via the event sink) since
    /// its egress shape is a single combined broadcast, not a per-victim one.
    pub fn player_melee_attack(
        &mut self,
        id: PlayerId,
        aim_angle: f64,
        now: Instant,
    ) -> Vec<(PlayerId, bool)> {
        let Some((range, position)) = self.players.get(&id).and_then(|p| {
            if p.is_alive() {
                Some((self.config.melee_range_px, p.position))
            } else {
                None
            }
        }) else {
            return Vec::new();
        };
        let _ = aim_angle; // melee is an arc-less proximity check, not a facing cone
        let victim_ids: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(vid, v)| {
                **vid != id && v.is_alive() && !v.is_invulnerable
                    && v.position.distance_to(position) <= range
            })
            .map(|(vid, _)| *vid)
            .collect();

        let damage = self.config.melee_damage;
        let mut results = Vec::with_capacity(victim_ids.len());
        for victim_id in victim_ids {
            if let Some(result) = self.damage_player(victim_id, id, damage, now) {
                results.push((victim_id, result.killed));
            }
        }
        results
    }

    pub fn player_dodge_roll(&mut self, id: PlayerId, aim_angle: f64, now: Instant) -> bool {
        let Some(p) = self.players.get_mut(&id) else {
            return false;
        };
        if !p.is_alive() || p.rolling {
            return false;
        }
        p.rolling = true;
        p.rolling_until = Some(now + Duration::from_millis(self.config.roll_duration_ms));
        p.aim_angle = aim_angle;
        p.velocity = Vec2::new(
            aim_angle.cos() * self.config.roll_speed,
            aim_angle.sin() * self.config.roll_speed,
        );
        true
    }

    pub fn apply_pickup(
        &mut self,
        player_id: PlayerId,
        crate_id: CrateId,
        now: Instant,
    ) -> PickupOutcome {
        let Some(player) = self.players.get(&player_id) else {
            return PickupOutcome::UnknownPlayer;
        };
        if !player.is_alive() {
            return PickupOutcome::UnknownPlayer;
        }
        let Some(c) = self.crates.get_mut(&crate_id) else {
            return PickupOutcome::UnknownCrate;
        };
        if !c.is_available {
            return PickupOutcome::NotAvailable;
        }
        let weapon_type = c.weapon_type;
        c.is_available = false;
        c.respawn_at = Some(now + Duration::from_millis(self.config.weapon_respawn_delay_ms));

        let player = self
            .players
            .get_mut(&player_id)
            .expect("checked present above");
        player.weapon = WeaponState::new(weapon_type, self.weapons.get(weapon_type));

        PickupOutcome::Confirmed { weapon_type }
    }

    pub fn get_player_state(&self, id: PlayerId) -> Option<PlayerStateSnapshot> {
        self.players.get(&id).map(PlayerStateSnapshot::from)
    }

    pub fn get_weapon_state(&self, id: PlayerId) -> Option<WeaponStateSnapshot> {
        self.players.get(&id).map(|p| WeaponStateSnapshot {
            weapon_type: p.weapon.weapon_type,
            ammo_in_magazine: p.weapon.ammo_in_magazine,
            magazine_size: p.weapon.magazine_size,
            reloading: p.weapon.is_reloading(),
        })
    }

    pub fn get_all_player_states(&self) -> Vec<PlayerStateSnapshot> {
        self.players.values().map(PlayerStateSnapshot::from).collect()
    }

    pub fn get_all_projectiles(&self) -> Vec<ProjectileSnapshot> {
        self.projectiles.values().map(ProjectileSnapshot::from).collect()
    }

    pub fn get_all_crates(&self) -> Vec<CrateSnapshot> {
        self.crates.values().map(CrateSnapshot::from).collect()
    }

    pub fn get_crate(&self, id: CrateId) -> Option<CrateSnapshot> {
        self.crates.get(&id).map(CrateSnapshot::from)
    }

    /// Flips a player into the dead state: sets `death_time` and schedules
    /// `respawn_at`. Does not touch `deaths`/`kills`/`xp` — those are stat
    /// increments owned by the hit handler, not by the death transition
    /// itself, so non-combat death paths can reuse this without crediting
    /// a kill to anyone.
    pub fn mark_player_dead(&mut self, id: PlayerId, now: Instant) {
        if let Some(p) = self.players.get_mut(&id) {
            if p.is_alive() {
                p.death_time = Some(now);
                p.respawn_at =
                    Some(now + Duration::from_millis(self.config.respawn_delay_ms));
            }
        }
    }

    /// Applies `damage` to `victim_id`, crediting `attacker_id` with a kill
    /// if it's lethal. Self-damage still kills the victim but never credits
    /// a kill to the attacker. Shared by projectile-hit and melee handling.
    fn damage_player(
        &mut self,
        victim_id: PlayerId,
        attacker_id: PlayerId,
        damage: f64,
        now: Instant,
    ) -> Option<DamageResult> {
        let victim = self.players.get_mut(&victim_id)?;
        if !victim.is_alive() || victim.is_invulnerable {
            return None;
        }
        victim.health = (victim.health - damage).max(0.0);
        victim.is_regenerating_health = false;
        victim.regen_eligible_at =
            Some(now + Duration::from_millis(self.config.health_regen_delay_ms));
        let new_health = victim.health;
        let killed = new_health <= 0.0;

        if killed {
            self.mark_player_dead(victim_id, now);
            if let Some(victim) = self.players.get_mut(&victim_id) {
                victim.deaths += 1;
            }
            if attacker_id != victim_id {
                if let Some(attacker) = self.players.get_mut(&attacker_id) {
                    attacker.kills += 1;
                    attacker.xp += self.config.kill_xp_reward;
                }
            }
        }

        Some(DamageResult { new_health, killed })
    }

    /// Advances the simulation by one fixed tick. Sub-steps run in a fixed
    /// order so that, within a single tick, a projectile can kill a player
    /// before that player's regen/respawn timers are evaluated:
    /// 1. integrate player movement from queued input
    /// 2. advance projectiles, despawn expired/out-of-bounds ones, resolve hits
    /// 3. respawn scheduled weapon crates
    /// 4. resolve health regen and player respawns
    /// 5. resolve reload completion and roll expiry
    pub fn step(&mut self, dt: f64, now: Instant) {
        self.integrate_movement(dt);
        self.advance_projectiles(dt, now);
        self.respawn_crates(now);
        self.resolve_regen_and_respawn(dt, now);
        self.resolve_reload_and_roll(now);
    }

    fn integrate_movement(&mut self, dt: f64) {
        let (w, h) = (self.config.arena_width, self.config.arena_height);
        for p in self.players.values_mut() {
            if !p.is_alive() {
                p.velocity = Vec2::ZERO;
                continue;
            }
            if p.rolling {
                // Velocity was set once at roll start; just keep integrating it.
                p.position.x = (p.position.x + p.velocity.x * dt).clamp(0.0, w);
                p.position.y = (p.position.y + p.velocity.y * dt).clamp(0.0, h);
                continue;
            }

            let mut dir = Vec2::ZERO;
            if p.input.up {
                dir.y -= 1.0;
            }
            if p.input.down {
                dir.y += 1.0;
            }
            if p.input.left {
                dir.x -= 1.0;
            }
            if p.input.right {
                dir.x += 1.0;
            }
            let len = (dir.x * dir.x + dir.y * dir.y).sqrt();
            if len > 0.0 {
                dir.x /= len;
                dir.y /= len;
            }
            let mut speed = self.config.player_move_speed;
            if p.input.is_sprinting {
                speed *= self.config.player_sprint_multiplier;
            }
            p.velocity = Vec2::new(dir.x * speed, dir.y * speed);
            p.position.x = (p.position.x + p.velocity.x * dt).clamp(0.0, w);
            p.position.y = (p.position.y + p.velocity.y * dt).clamp(0.0, h);
        }
    }

    fn advance_projectiles(&mut self, dt: f64, now: Instant) {
        let (w, h) = (self.config.arena_width, self.config.arena_height);
        let mut hits = Vec::new();
        let mut expired = Vec::new();

        for (id, proj) in self.projectiles.iter_mut() {
            proj.position.x += proj.velocity.x * dt;
            proj.position.y += proj.velocity.y * dt;

            if proj.is_expired(now) || proj.is_out_of_bounds(w, h) {
                expired.push(*id);
                continue;
            }

            for (player_id, player) in self.players.iter() {
                if *player_id == proj.owner_id {
                    continue;
                }
                if !player.is_alive() || player.is_invulnerable {
                    continue;
                }
                if player.position.distance_to(proj.position) <= PLAYER_HIT_RADIUS_PX {
                    hits.push((*id, *player_id, proj.owner_id, proj.damage));
                    break;
                }
            }
        }

        for (projectile_id, victim_id, attacker_id, damage) in hits {
            self.projectiles.remove(&projectile_id);
            if let Some(result) = self.damage_player(victim_id, attacker_id, damage, now) {
                self.events.emit(WorldEvent::Hit(HitEvent {
                    victim_id,
                    attacker_id,
                    projectile_id,
                    damage,
                    new_health: result.new_health,
                    killed: result.killed,
                }));
            }
        }
        for id in expired {
            self.projectiles.remove(&id);
        }
    }

    fn respawn_crates(&mut self, now: Instant) {
        for c in self.crates.values_mut() {
            if !c.is_available {
                if let Some(respawn_at) = c.respawn_at {
                    if now >= respawn_at {
                        c.is_available = true;
                        c.respawn_at = None;
                        self.events
                            .emit(WorldEvent::WeaponRespawn(WeaponRespawnEvent {
                                crate_id: c.id,
                                weapon_type: c.weapon_type,
                                position: c.position,
                            }));
                    }
                }
            }
        }
    }

    fn resolve_regen_and_respawn(&mut self, dt: f64, now: Instant) {
        let regen_per_sec = self.config.health_regen_per_sec;
        for p in self.players.values_mut() {
            if p.is_alive() {
                if let Some(eligible_at) = p.regen_eligible_at {
                    if now >= eligible_at && p.health < self.config.player_max_health {
                        p.is_regenerating_health = true;
                        p.health = (p.health + regen_per_sec * dt).min(self.config.player_max_health);
                    } else {
                        p.is_regenerating_health = false;
                    }
                }
                if let Some(until) = p.invulnerable_until {
                    if now >= until {
                        p.is_invulnerable = false;
                        p.invulnerable_until = None;
                    }
                }
                continue;
            }

            if let Some(respawn_at) = p.respawn_at {
                if now >= respawn_at {
                    p.position = Vec2::new(
                        rand::rng().random_range(0.0..self.config.arena_width),
                        rand::rng().random_range(0.0..self.config.arena_height),
                    );
                    p.health = self.config.player_max_health;
                    p.death_time = None;
                    p.respawn_at = None;
                    p.is_invulnerable = true;
                    p.invulnerable_until = Some(
                        now + Duration::from_millis(self.config.respawn_invulnerability_ms),
                    );
                    p.is_regenerating_health = false;
                    p.regen_eligible_at = None;
                    p.weapon = WeaponState::new(
                        WeaponType::Pistol,
                        self.weapons.get(WeaponType::Pistol),
                    );

                    self.events.emit(WorldEvent::Respawn(RespawnEvent {
                        player_id: p.id,
                        position: p.position,
                        health: p.health,
                    }));
                }
            }
        }
    }

    fn resolve_reload_and_roll(&mut self, now: Instant) {
        for p in self.players.values_mut() {
            if let Some(finishes_at) = p.weapon.reload_finishes_at {
                if now >= finishes_at {
                    p.weapon.ammo_in_magazine = p.weapon.magazine_size;
                    p.weapon.reload_finishes_at = None;
                    self.events
                        .emit(WorldEvent::ReloadComplete(ReloadCompleteEvent {
                            player_id: p.id,
                        }));
                }
            }
            if let Some(until) = p.rolling_until {
                if now >= until {
                    p.rolling = false;
                    p.rolling_until = None;
                    self.events.emit(WorldEvent::RollEnd(RollEndEvent {
                        player_id: p.id,
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::RecordingEventSink;
    use std::sync::Arc as StdArc;

    fn test_world() -> (World, StdArc<RecordingEventSink>) {
        let sink = StdArc::new(RecordingEventSink::new());
        let world = World::new(Arc::new(SimulationConfig::default()), sink.clone());
        (world, sink)
    }

    #[test]
    fn add_player_is_idempotent() {
        let (mut world, _sink) = test_world();
        let id = PlayerId::new_v4();
        assert!(world.add_player(id));
        assert!(!world.add_player(id));
        assert_eq!(world.get_all_player_states().len(), 1);
    }

    #[test]
    fn shoot_fails_with_empty_magazine() {
        let (mut world, _sink) = test_world();
        let id = PlayerId::new_v4();
        world.add_player(id);
        let now = Instant::now();
        let magazine_size = world.get_weapon_state(id).unwrap().magazine_size;
        for _ in 0..magazine_size {
            match world.player_shoot(id, 0.0, now) {
                ShootOutcome::Spawned { .. } => {}
                other => panic!("expected a spawn, got {other:?}"),
            }
        }
        match world.player_shoot(id, 0.0, now) {
            ShootOutcome::Failed(ShootFailureReason::EmptyMagazine) => {}
            other => panic!("expected empty magazine, got {other:?}"),
        }
    }

    #[test]
    fn shoot_respects_cooldown() {
        let (mut world, _sink) = test_world();
        let id = PlayerId::new_v4();
        world.add_player(id);
        let t0 = Instant::now();
        assert!(matches!(
            world.player_shoot(id, 0.0, t0),
            ShootOutcome::Spawned { .. }
        ));
        assert!(matches!(
            world.player_shoot(id, 0.0, t0),
            ShootOutcome::Failed(ShootFailureReason::Cooldown)
        ));
    }

    #[test]
    fn pickup_fails_when_not_available() {
        let (mut world, _sink) = test_world();
        let player = PlayerId::new_v4();
        world.add_player(player);
        let now = Instant::now();
        let crate_id = world.get_all_crates()[0].id;

        assert!(matches!(
            world.apply_pickup(player, crate_id, now),
            PickupOutcome::Confirmed { .. }
        ));
        assert!(matches!(
            world.apply_pickup(player, crate_id, now),
            PickupOutcome::NotAvailable
        ));
    }

    #[test]
    fn pickup_of_unknown_crate_is_reported() {
        let (mut world, _sink) = test_world();
        let player = PlayerId::new_v4();
        world.add_player(player);
        let now = Instant::now();
        assert!(matches!(
            world.apply_pickup(player, CrateId::new_v4(), now),
            PickupOutcome::UnknownCrate
        ));
    }

    #[test]
    fn damage_player_credits_kill_and_not_self_kill() {
        let (mut world, sink) = test_world();
        let attacker = PlayerId::new_v4();
        let victim = PlayerId::new_v4();
        world.add_player(attacker);
        world.add_player(victim);
        let now = Instant::now();

        let lethal = world.config.player_max_health + 10.0;
        let result = world.damage_player(victim, attacker, lethal, now).unwrap();
        assert!(result.killed);
        assert_eq!(world.get_player_state(attacker).unwrap().kills, 1);
        assert!(!world.get_player_state(victim).unwrap().is_alive);

        world.add_player(PlayerId::new_v4());
        let _ = sink;
    }

    #[test]
    fn self_damage_kills_without_crediting_a_kill() {
        let (mut world, _sink) = test_world();
        let id = PlayerId::new_v4();
        world.add_player(id);
        let now = Instant::now();
        let lethal = world.config.player_max_health + 10.0;
        let result = world.damage_player(id, id, lethal, now).unwrap();
        assert!(result.killed);
        assert_eq!(world.get_player_state(id).unwrap().kills, 0);
        assert_eq!(world.get_player_state(id).unwrap().deaths, 1);
    }

    #[test]
    fn dead_player_does_not_take_further_damage() {
        let (mut world, _sink) = test_world();
        let attacker = PlayerId::new_v4();
        let victim = PlayerId::new_v4();
        world.add_player(attacker);
        world.add_player(victim);
        let now = Instant::now();
        let lethal = world.config.player_max_health + 10.0;
        assert!(world.damage_player(victim, attacker, lethal, now).is_some());
        assert!(world.damage_player(victim, attacker, 5.0, now).is_none());
    }

    #[test]
    fn step_despawns_expired_projectiles() {
        let (mut world, _sink) = test_world();
        let id = PlayerId::new_v4();
        world.add_player(id);
        let t0 = Instant::now();
        world.player_shoot(id, 0.0, t0);
        assert_eq!(world.get_all_projectiles().len(), 1);

        let ttl = world.config.default_projectile_ttl_ms;
        let t1 = t0 + Duration::from_millis(ttl + 50);
        world.step(0.05, t1);
        assert!(world.get_all_projectiles().is_empty());
    }

    #[test]
    fn step_respawns_dead_player_after_delay() {
        let (mut world, _sink) = test_world();
        let attacker = PlayerId::new_v4();
        let victim = PlayerId::new_v4();
        world.add_player(attacker);
        world.add_player(victim);
        let t0 = Instant::now();
        let lethal = world.config.player_max_health + 10.0;
        world.damage_player(victim, attacker, lethal, t0);
        assert!(!world.get_player_state(victim).unwrap().is_alive);

        let respawn_delay = world.config.respawn_delay_ms;
        let t1 = t0 + Duration::from_millis(respawn_delay + 50);
        world.step(0.05, t1);
        assert!(world.get_player_state(victim).unwrap().is_alive);
        assert!(world.get_player_state(victim).unwrap().is_invulnerable);
    }

    #[test]
    fn melee_attack_hits_players_in_range_but_not_self() {
        let (mut world, _sink) = test_world();
        let attacker = PlayerId::new_v4();
        let victim = PlayerId::new_v4();
        world.add_player(attacker);
        world.add_player(victim);

        // Force a known layout so the range check is deterministic.
        let now = Instant::now();
        {
            let a = world.players.get_mut(&attacker).unwrap();
            a.position = Vec2::new(100.0, 100.0);
        }
        {
            let v = world.players.get_mut(&victim).unwrap();
            v.position = Vec2::new(110.0, 100.0);
        }

        let hits = world.player_melee_attack(attacker, 0.0, now);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, victim);
    }
}
