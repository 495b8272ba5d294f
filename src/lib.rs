#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Shooter Server
//!
//! The authoritative server for a realtime 2D multiplayer shooter: clients
//! connect over WebSocket, are paired into rooms, and receive
//! delta-compressed simulation updates while submitting inputs.
//!
//! The core runs a fixed-rate authoritative simulation ([`world`]) behind a
//! single lock, broadcasts it through a per-client delta tracker
//! ([`delta`], [`broadcast`]), and drives both off two scheduler loops
//! ([`scheduler`]) independent of the WebSocket transport ([`websocket`])
//! that feeds it.

/// Delta-compressed state broadcast: sanitization, snapshot/delta
/// decisions, and egress fan-out.
pub mod broadcast;

/// Layered configuration and environment variables.
pub mod config;

/// Per-client last-sent state for the delta/snapshot decision.
pub mod delta;

/// Construction-time error types.
pub mod error;

/// Structured logging configuration.
pub mod logging;

/// Per-room match score/timer state machine.
pub mod match_state;

/// Process-wide counters, exposed as JSON and Prometheus text.
pub mod metrics;

/// Wire protocol: envelopes, typed ingress/egress messages.
pub mod protocol;

/// Room membership, pairing, and lifecycle.
pub mod room;

/// Schema Validator: compiles and caches named JSON schemas.
pub mod schema;

/// Clock & Tick Scheduler: the sim loop and match-timer loop.
pub mod scheduler;

/// Server orchestration: shared World, connection registry, message
/// dispatch, and event-to-broadcast handling.
pub mod server;

/// WebSocket transport: upgrade handler and HTTP endpoints.
pub mod websocket;

/// Authoritative simulation: players, projectiles, weapon crates.
pub mod world;
