use serde::{Deserialize, Serialize};

/// Artificial network conditions for local testing (§6:
/// `SIMULATE_LATENCY`, `SIMULATE_PACKET_LOSS`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkSimConfig {
    /// Per-send artificial delay, clamped 0..300ms, ±20ms jitter applied at
    /// send time.
    pub simulate_latency_ms: u64,
    /// Probabilistic egress drop percentage, clamped 0..20.
    pub simulate_packet_loss_percent: u8,
}

impl Default for NetworkSimConfig {
    fn default() -> Self {
        Self {
            simulate_latency_ms: 0,
            simulate_packet_loss_percent: 0,
        }
    }
}

impl NetworkSimConfig {
    pub fn clamped(mut self) -> Self {
        self.simulate_latency_ms = self.simulate_latency_ms.min(300);
        self.simulate_packet_loss_percent = self.simulate_packet_loss_percent.min(20);
        self
    }
}
