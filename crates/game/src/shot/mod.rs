mod projectile;
mod tracker;

pub use projectile::Shot;
pub use tracker::{ShotCharge, ShotTracker};
