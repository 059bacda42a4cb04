use std::hash::{BuildHasher, RandomState};
use std::time::Instant;

use serde::Deserialize;

/// Outbound loss injection for exercising a degraded link by hand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    pub loss_percent: f32,
}

impl PacketLossSimulation {
    pub fn with_loss(loss_percent: f32) -> Self {
        Self {
            enabled: loss_percent > 0.0,
            loss_percent: loss_percent.clamp(0.0, 100.0),
        }
    }

    pub fn should_drop(&self) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        if self.loss_percent >= 100.0 {
            return true;
        }
        roll_percent() < self.loss_percent
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_dropped: u64,
    pub retransmissions: u64,
    pub send_errors: u64,
    pub receive_errors: u64,
    pub decode_errors: u64,
}

/// Uniform roll in `[0, 100)`, seeded per call from a fresh `RandomState`.
fn roll_percent() -> f32 {
    let bits = RandomState::new().hash_one(Instant::now());
    (bits >> 40) as f32 / (1u64 << 24) as f32 * 100.0
}
