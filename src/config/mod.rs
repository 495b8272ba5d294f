//! Layered configuration for the shooter server.
//!
//! # Module structure
//!
//! - [`types`]: root `Config` struct.
//! - [`server`]: room/match/scheduler tunables.
//! - [`simulation`]: arena bounds and weapon-timing constants table.
//! - [`schema`]: Schema Validator directory + egress-validation toggle.
//! - [`network_sim`]: artificial latency/packet-loss knobs.
//! - [`logging`]: logging format/level/rotation.
//! - [`loader`]: layered loading (defaults → file → env overrides).
//! - [`validation`]: startup sanity checks run once by `main` before bind.

pub mod loader;
pub mod logging;
pub mod network_sim;
pub mod schema;
pub mod server;
pub mod simulation;
pub mod types;
pub mod validation;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use network_sim::NetworkSimConfig;
pub use schema::SchemaConfig;
pub use server::ServerConfig;
pub use simulation::SimulationConfig;
pub use types::Config;
pub use validation::validate;
