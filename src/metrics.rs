//! Process-wide counters, exposed as JSON and Prometheus text exposition.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub active_connections: AtomicU64,
    pub active_rooms: AtomicU64,
    pub messages_in: AtomicU64,
    pub messages_out: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub schema_validation_failures: AtomicU64,
    pub matches_ended_kill_target: AtomicU64,
    pub matches_ended_time_limit: AtomicU64,
    pub matches_ended_manual: AtomicU64,
}

impl ServerMetrics {
    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        ServerMetricsSnapshot {
            active_connections: self.active_connections.load(Ordering::Relaxed),
            active_rooms: self.active_rooms.load(Ordering::Relaxed),
            messages_in: self.messages_in.load(Ordering::Relaxed),
            messages_out: self.messages_out.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            schema_validation_failures: self.schema_validation_failures.load(Ordering::Relaxed),
            matches_ended_kill_target: self.matches_ended_kill_target.load(Ordering::Relaxed),
            matches_ended_time_limit: self.matches_ended_time_limit.load(Ordering::Relaxed),
            matches_ended_manual: self.matches_ended_manual.load(Ordering::Relaxed),
        }
    }

    pub fn render_prometheus(&self) -> String {
        let snap = self.snapshot();
        format!(
            "# HELP shooter_active_connections Currently connected clients\n\
             # TYPE shooter_active_connections gauge\n\
             shooter_active_connections {}\n\
             # HELP shooter_active_rooms Currently active rooms\n\
             # TYPE shooter_active_rooms gauge\n\
             shooter_active_rooms {}\n\
             # HELP shooter_messages_in_total Ingress messages processed\n\
             # TYPE shooter_messages_in_total counter\n\
             shooter_messages_in_total {}\n\
             # HELP shooter_messages_out_total Egress messages sent\n\
             # TYPE shooter_messages_out_total counter\n\
             shooter_messages_out_total {}\n\
             # HELP shooter_frames_dropped_total Egress frames dropped (queue full)\n\
             # TYPE shooter_frames_dropped_total counter\n\
             shooter_frames_dropped_total {}\n\
             # HELP shooter_schema_validation_failures_total Ingress schema validation failures\n\
             # TYPE shooter_schema_validation_failures_total counter\n\
             shooter_schema_validation_failures_total {}\n\
             # HELP shooter_matches_ended_total Matches ended, by reason\n\
             # TYPE shooter_matches_ended_total counter\n\
             shooter_matches_ended_total{{reason=\"kill_target\"}} {}\n\
             shooter_matches_ended_total{{reason=\"time_limit\"}} {}\n\
             shooter_matches_ended_total{{reason=\"manual\"}} {}\n",
            snap.active_connections,
            snap.active_rooms,
            snap.messages_in,
            snap.messages_out,
            snap.frames_dropped,
            snap.schema_validation_failures,
            snap.matches_ended_kill_target,
            snap.matches_ended_time_limit,
            snap.matches_ended_manual,
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerMetricsSnapshot {
    pub active_connections: u64,
    pub active_rooms: u64,
    pub messages_in: u64,
    pub messages_out: u64,
    pub frames_dropped: u64,
    pub schema_validation_failures: u64,
    pub matches_ended_kill_target: u64,
    pub matches_ended_time_limit: u64,
    pub matches_ended_manual: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = ServerMetrics::default();
        metrics.active_connections.fetch_add(2, Ordering::Relaxed);
        metrics.messages_in.fetch_add(5, Ordering::Relaxed);
        let snap = metrics.snapshot();
        assert_eq!(snap.active_connections, 2);
        assert_eq!(snap.messages_in, 5);
    }

    #[test]
    fn prometheus_render_contains_all_metric_names() {
        let metrics = ServerMetrics::default();
        let rendered = metrics.render_prometheus();
        assert!(rendered.contains("shooter_active_connections"));
        assert!(rendered.contains("shooter_matches_ended_total"));
    }
}
