use std::collections::BTreeMap;
use std::time::Duration;

use glam::DVec2;
use treacherous::{PlayerId, PlayerRegistry, TILE_SIZE};

/// What the reporter remembers about a player between ticks.
#[derive(Debug, Clone)]
struct Seen {
    name: String,
    position: DVec2,
    is_dead: bool,
    shot_in_flight: bool,
}

/// Turns registry changes into human-readable lines.
#[derive(Debug, Default)]
pub struct StatusReporter {
    seen: BTreeMap<PlayerId, Seen>,
    since_summary: Duration,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines describing everything that changed since the previous call.
    pub fn diff(&mut self, registry: &PlayerRegistry, local: Option<PlayerId>) -> Vec<String> {
        let mut lines = Vec::new();

        self.seen.retain(|id, seen| {
            let present = registry.contains(*id);
            if !present {
                lines.push(format!("{} ({}) left", seen.name, id));
            }
            present
        });

        for (id, player) in registry.iter() {
            let tag = if Some(id) == local { " [you]" } else { "" };
            let Some(seen) = self.seen.get_mut(&id) else {
                lines.push(format!("{} ({}){} joined", player.name, id, tag));
                self.seen.insert(
                    id,
                    Seen {
                        name: player.name.clone(),
                        position: player.position,
                        is_dead: player.is_dead,
                        shot_in_flight: player.has_shot_in_flight(),
                    },
                );
                continue;
            };

            if player.is_dead && !seen.is_dead {
                lines.push(format!("{} ({}){} died", player.name, id, tag));
            }
            if player.has_shot_in_flight() && !seen.shot_in_flight {
                lines.push(format!("{} ({}){} fired", player.name, id, tag));
            }
            // Only the local player's movement is interesting, and only
            // once it has crossed a tile.
            if Some(id) == local && player.position.distance(seen.position) >= TILE_SIZE {
                lines.push(format!(
                    "you are at ({:.0}, {:.0})",
                    player.position.x, player.position.y
                ));
                seen.position = player.position;
            }

            seen.is_dead = player.is_dead;
            seen.shot_in_flight = player.has_shot_in_flight();
        }

        lines
    }

    /// True once per `interval` of accumulated tick time.
    pub fn summary_due(&mut self, elapsed: Duration, interval: Duration) -> bool {
        self.since_summary += elapsed;
        if self.since_summary < interval {
            return false;
        }
        self.since_summary = Duration::ZERO;
        true
    }
}
