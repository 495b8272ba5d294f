//! Clock & Tick Scheduler: drives the shared [`World`] at a fixed simulation
//! rate, the per-room match timer at a slower cadence, and a room-cleanup
//! sweep at a slower cadence still, the way the ambient server's
//! `cleanup_task` runs its own `tokio::time::interval` loop as a spawned
//! background task (`src/server/maintenance.rs`).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::server::ShooterServer;
use crate::world::events::WorldEvent;

/// Owns the three background loops and the token used to stop them.
/// Dropping a `Scheduler` does not stop its loops; call [`Scheduler::stop`]
/// and [`Scheduler::join`] explicitly during shutdown.
pub struct Scheduler {
    cancel: CancellationToken,
    sim_task: JoinHandle<()>,
    timer_task: JoinHandle<()>,
    cleanup_task: JoinHandle<()>,
}

impl Scheduler {
    /// Spawns the sim loop, the match-timer loop, and the room-cleanup
    /// sweep, all reading their cadence from `server.config().server`.
    pub fn start(server: Arc<ShooterServer>, events: mpsc::UnboundedReceiver<WorldEvent>) -> Self {
        let cancel = CancellationToken::new();

        let sim_tick_hz = server.config().server.sim_tick_hz.max(1);
        let timer_tick_hz = server.config().server.timer_tick_hz.max(1);
        let cleanup_interval = Duration::from_secs(server.config().server.room_cleanup_interval_secs.max(1));

        let sim_task = {
            let server = server.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run_sim_loop(server, events, sim_tick_hz, cancel).await;
            })
        };

        let timer_task = {
            let server = server.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run_match_timer_loop(server, timer_tick_hz, cancel).await;
            })
        };

        let cleanup_task = {
            let server = server.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run_room_cleanup_loop(server, cleanup_interval, cancel).await;
            })
        };

        Self {
            cancel,
            sim_task,
            timer_task,
            cleanup_task,
        }
    }

    /// Signals all three loops to stop at their next tick boundary. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Waits for all three loops to actually exit after `stop` was called.
    pub async fn join(self) {
        let _ = self.sim_task.await;
        let _ = self.timer_task.await;
        let _ = self.cleanup_task.await;
    }
}

async fn run_sim_loop(
    server: Arc<ShooterServer>,
    mut events: mpsc::UnboundedReceiver<WorldEvent>,
    tick_hz: u32,
    cancel: CancellationToken,
) {
    let period = std::time::Duration::from_secs_f64(1.0 / tick_hz as f64);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let dt = period.as_secs_f64();

    info!(tick_hz, "simulation loop started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            tick = interval.tick() => {
                server.tick_simulation(dt, tick, &mut events).await;
            }
        }
    }
    info!("simulation loop stopped");
}

async fn run_match_timer_loop(server: Arc<ShooterServer>, tick_hz: u32, cancel: CancellationToken) {
    let period = std::time::Duration::from_secs_f64(1.0 / tick_hz as f64);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(tick_hz, "match timer loop started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            tick = interval.tick() => {
                let now: Instant = tick;
                server.tick_match_timers(now).await;
            }
        }
    }
    info!("match timer loop stopped");
}

/// Prunes ended rooms whose members never disconnected. Runs at the same
/// cadence as its own grace period, so a room survives at least one full
/// sweep interval past match-end before it's freed.
async fn run_room_cleanup_loop(server: Arc<ShooterServer>, interval_period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval_period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(?interval_period, "room cleanup loop started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            tick = interval.tick() => {
                let now: Instant = tick;
                server.sweep_rooms(now, interval_period);
            }
        }
    }
    info!("room cleanup loop stopped");
}
