//! Construction-time error types.
//!
//! Per §7, only startup/construction failures (schema compilation, config
//! validation) are propagated as typed errors up through `main`; steady-state
//! per-message and per-connection errors are local, logged, and swallowed at
//! the point of detection (never turned into a `Result` that escapes the
//! connection task).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("schema file {path} is not valid JSON: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("schema {name} failed to compile: {message}")]
    Compile { name: String, message: String },
}

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("server.room_capacity must be at least 1 (got {0})")]
    RoomCapacityTooSmall(usize),
    #[error("simulation.arena_width and arena_height must be positive")]
    InvalidArenaBounds,
    #[error("server.outbound_queue_capacity must be at least 1 (got {0})")]
    QueueCapacityTooSmall(usize),
}
