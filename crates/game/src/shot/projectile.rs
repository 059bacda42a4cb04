use glam::DVec2;

use crate::config::ShotConfig;
use crate::net::ShotFired;

/// A shot in flight, attached to the player that fired it.
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub origin: DVec2,
    pub direction: f64,
    pub distance: f64,
    elapsed: f64,
}

impl Shot {
    pub fn new(origin: DVec2, direction: f64, distance: f64) -> Self {
        Self {
            origin,
            direction,
            distance,
            elapsed: 0.0,
        }
    }

    pub fn from_fired(fired: &ShotFired) -> Self {
        Self::new(fired.origin, fired.direction, fired.distance)
    }

    /// True when `fired` describes this same shot.
    pub fn matches(&self, fired: &ShotFired) -> bool {
        self.origin == fired.origin
            && self.direction == fired.direction
            && self.distance == fired.distance
    }

    pub fn update(&mut self, dt: f64) {
        self.elapsed += dt.max(0.0);
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Where the shot lands.
    pub fn target(&self) -> DVec2 {
        self.origin + DVec2::from_angle(self.direction) * self.distance
    }

    /// Expansion progress in `0.0..=1.0`.
    pub fn progress(&self, config: &ShotConfig) -> f64 {
        if config.expand_secs <= 0.0 {
            return 1.0;
        }
        (self.elapsed / config.expand_secs).clamp(0.0, 1.0)
    }

    pub fn radius(&self, config: &ShotConfig) -> f64 {
        self.progress(config) * config.blast_radius
    }
}
