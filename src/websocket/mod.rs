//! WebSocket transport: the `/ws` upgrade handler, the send/receive task
//! pair bridging a socket to the connection registry, and the HTTP
//! `/health`/`/metrics` endpoints. No authentication or token binding is
//! carried over; every connection is registered and paired into a room
//! on upgrade.

mod connection;
mod handler;
mod metrics;
mod routes;

pub use handler::websocket_handler;
pub use metrics::{metrics_handler, prometheus_metrics_handler};
pub use routes::create_router;
