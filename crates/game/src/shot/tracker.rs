use crate::config::ShotConfig;
use crate::map::TileMap;
use crate::net::{PlayerId, ShotFired};
use crate::player::PlayerRegistry;

use super::projectile::Shot;

/// Charge accumulated while the local fire button is held.
#[derive(Debug, Clone, Default)]
pub struct ShotCharge {
    distance: f64,
    held: bool,
}

impl ShotCharge {
    /// Feeds one input sample. Returns the charged distance on release.
    pub fn update(&mut self, held: bool, elapsed: f64, config: &ShotConfig) -> Option<f64> {
        if held {
            self.held = true;
            self.distance = (self.distance + config.charge_rate * elapsed.max(0.0))
                .min(config.max_distance);
            return None;
        }

        if !self.held {
            return None;
        }
        self.held = false;
        Some(std::mem::take(&mut self.distance))
    }

    /// Discards the charge without firing.
    pub fn cancel(&mut self) {
        if self.held {
            log::debug!("Discarding shot charge {:.1}", self.distance);
        }
        *self = Self::default();
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn is_charging(&self) -> bool {
        self.held
    }
}

/// Enforces one outstanding shot per player. Only the server's TILE_DAMAGED
/// echo reopens firing.
#[derive(Debug, Clone)]
pub struct ShotTracker {
    config: ShotConfig,
    charge: ShotCharge,
}

impl ShotTracker {
    pub fn new(config: ShotConfig) -> Self {
        Self {
            config,
            charge: ShotCharge::default(),
        }
    }

    pub fn config(&self) -> &ShotConfig {
        &self.config
    }

    pub fn charge(&self) -> &ShotCharge {
        &self.charge
    }

    pub fn cancel_charge(&mut self) {
        self.charge.cancel();
    }

    pub fn update_charge(&mut self, held: bool, elapsed: f64) -> Option<f64> {
        self.charge.update(held, elapsed, &self.config)
    }

    /// Takes the optimistic lock for `id` and builds the SHOT to send.
    /// `None` if the player is unknown, dead, or already has a shot out.
    pub fn try_fire(
        &mut self,
        registry: &mut PlayerRegistry,
        id: PlayerId,
        distance: f64,
    ) -> Option<ShotFired> {
        let player = registry.get_mut(id)?;
        if player.is_dead {
            log::debug!("Player {} is dead, not firing", id);
            return None;
        }
        if !player.shot_allowed {
            log::debug!("Player {} already has a shot in flight", id);
            return None;
        }

        player.shot_allowed = false;
        Some(ShotFired {
            id,
            origin: player.position,
            direction: player.direction,
            distance,
        })
    }

    /// Attaches an expanding shot to the firing player, local or remote.
    pub fn on_shot(&self, registry: &mut PlayerRegistry, fired: &ShotFired) -> bool {
        let Some(player) = registry.get_mut(fired.id) else {
            log::debug!("SHOT for unknown player {}", fired.id);
            return false;
        };

        // A repeated echo of the same shot must not restart its expansion.
        if player.shot.as_ref().is_some_and(|shot| shot.matches(fired)) {
            return true;
        }
        player.attach_shot(Shot::from_fired(fired));
        true
    }

    /// Forwards the damage to the map and resolves the player's shot.
    /// Returns whether the player was known.
    pub fn on_tile_damaged<M: TileMap + ?Sized>(
        &self,
        registry: &mut PlayerRegistry,
        map: &mut M,
        x: f32,
        y: f32,
        id: PlayerId,
    ) -> bool {
        match map.tile_at(f64::from(x), f64::from(y)) {
            Some(tile) => tile.apply_damage(id),
            None => log::debug!("TILE_DAMAGED at ({}, {}) hit no tile", x, y),
        }

        match registry.get_mut(id) {
            Some(player) => {
                player.resolve_shot();
                true
            }
            None => false,
        }
    }

    /// Advances the expansion of every shot in flight.
    pub fn advance(&self, registry: &mut PlayerRegistry, dt: f64) {
        for (_, player) in registry.iter_mut() {
            if let Some(shot) = player.shot.as_mut() {
                shot.update(dt);
            }
        }
    }
}
