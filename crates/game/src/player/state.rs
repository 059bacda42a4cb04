use glam::DVec2;

use crate::net::InputSnapshot;
use crate::shot::Shot;

/// Client-side view of one connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub name: String,
    pub position: DVec2,
    /// Facing, in radians.
    pub direction: f64,
    pub hover: bool,
    /// Last input snapshot this client sent for the player (local player only).
    pub last_input: InputSnapshot,
    /// False while a shot by this player is in flight.
    pub shot_allowed: bool,
    pub is_dead: bool,
    pub shot: Option<Shot>,
}

impl PlayerState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: DVec2::ZERO,
            direction: 0.0,
            hover: false,
            last_input: InputSnapshot::default(),
            shot_allowed: true,
            is_dead: false,
            shot: None,
        }
    }

    pub fn apply_update(&mut self, direction: f64, position: DVec2, hover: bool) {
        self.direction = direction;
        self.position = position;
        self.hover = hover;
    }

    pub fn attach_shot(&mut self, shot: Shot) {
        self.shot = Some(shot);
        self.shot_allowed = false;
    }

    /// Clears the in-flight shot and reopens firing. Returns the cleared shot.
    pub fn resolve_shot(&mut self) -> Option<Shot> {
        self.shot_allowed = true;
        self.shot.take()
    }

    pub fn has_shot_in_flight(&self) -> bool {
        self.shot.is_some()
    }
}
