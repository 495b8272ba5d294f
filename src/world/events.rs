use crate::protocol::{CrateId, PlayerId, ProjectileId, Vec2, WeaponType};

/// Produced by collision detection; consumed by the hit handler to
/// broadcast damage, death, and kill-credit messages (GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEvent {
    pub victim_id: PlayerId,
    pub attacker_id: PlayerId,
    pub projectile_id: ProjectileId,
    pub damage: f64,
    pub new_health: f64,
    pub killed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RespawnEvent {
    pub player_id: PlayerId,
    pub position: Vec2,
    pub health: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReloadCompleteEvent {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponRespawnEvent {
    pub crate_id: CrateId,
    pub weapon_type: WeaponType,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollEndEvent {
    pub player_id: PlayerId,
}

/// Events emitted by [`super::World::step`]. Drained by the sim loop after
/// each step and turned into broadcasts by the router's handlers — the
/// World never calls back into the router directly.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Hit(HitEvent),
    Respawn(RespawnEvent),
    ReloadComplete(ReloadCompleteEvent),
    WeaponRespawn(WeaponRespawnEvent),
    RollEnd(RollEndEvent),
}

/// The capability interface passed at World construction. Realized as a
/// non-blocking emit sink rather than direct callbacks so the World never
/// holds an async handle back into the connection layer; the default
/// [`ChannelEventSink`] just forwards to an unbounded channel the scheduler
/// drains after each step.
pub trait WorldEventSink: Send + Sync {
    fn emit(&self, event: WorldEvent);
}

pub struct ChannelEventSink {
    tx: tokio::sync::mpsc::UnboundedSender<WorldEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<WorldEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl WorldEventSink for ChannelEventSink {
    fn emit(&self, event: WorldEvent) {
        // An unbounded channel never blocks the sim loop; the receiver is
        // drained once per tick by the scheduler. Send only fails if the
        // scheduler's receiver half has been dropped, i.e. shutdown.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
pub struct RecordingEventSink {
    pub events: std::sync::Mutex<Vec<WorldEvent>>,
}

#[cfg(test)]
impl RecordingEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl WorldEventSink for RecordingEventSink {
    fn emit(&self, event: WorldEvent) {
        self.events.lock().unwrap().push(event);
    }
}
