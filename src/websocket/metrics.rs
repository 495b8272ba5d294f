use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::metrics::ServerMetricsSnapshot;
use crate::server::ShooterServer;

/// Process-wide counters as JSON, for dashboards or ad-hoc inspection.
pub async fn metrics_handler(State(server): State<Arc<ShooterServer>>) -> Json<ServerMetricsSnapshot> {
    Json(server.metrics_snapshot())
}

/// The same counters in Prometheus text exposition format.
pub async fn prometheus_metrics_handler(State(server): State<Arc<ShooterServer>>) -> axum::response::Response {
    axum::response::Response::builder()
        .header("content-type", "text/plain; version=0.0.4")
        .body(axum::body::Body::from(server.metrics_prometheus()))
        .unwrap_or_else(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
