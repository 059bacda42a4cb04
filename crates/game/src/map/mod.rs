mod hex;

pub use hex::{HexMap, HexTile, TILE_SIZE};

/// Lookup of terrain tiles by world coordinate.
pub trait TileMap {
    fn tile_at(&mut self, x: f64, y: f64) -> Option<&mut HexTile>;
}
