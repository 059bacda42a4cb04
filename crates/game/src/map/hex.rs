use glam::DVec2;

use crate::net::PlayerId;

use super::TileMap;

/// Width of a tile across its flat sides.
pub const TILE_SIZE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HexTile {
    center: DVec2,
    damage: u32,
    last_damaged_by: Option<PlayerId>,
}

impl HexTile {
    fn new(center: DVec2) -> Self {
        Self {
            center,
            damage: 0,
            last_damaged_by: None,
        }
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn damage(&self) -> u32 {
        self.damage
    }

    pub fn last_damaged_by(&self) -> Option<PlayerId> {
        self.last_damaged_by
    }

    pub fn apply_damage(&mut self, by: PlayerId) {
        self.damage = self.damage.saturating_add(1);
        self.last_damaged_by = Some(by);
    }
}

/// Pointy-top hex grid with odd rows shifted right by half a tile.
#[derive(Debug, Clone)]
pub struct HexMap {
    width: usize,
    height: usize,
    tiles: Vec<HexTile>,
}

impl HexMap {
    pub fn new(width: usize, height: usize) -> Self {
        let mut tiles = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                tiles.push(HexTile::new(tile_center(col as i64, row as i64)));
            }
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, col: usize, row: usize) -> Option<&HexTile> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.tiles.get(row * self.width + col)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &HexTile> {
        self.tiles.iter()
    }

    fn locate(&self, point: DVec2) -> Option<(usize, usize)> {
        let row_guess = (point.y / row_spacing()).round() as i64;
        let mut best: Option<(i64, i64, f64)> = None;

        for row in row_guess - 1..=row_guess + 1 {
            let col_guess = ((point.x - row_offset(row)) / TILE_SIZE).round() as i64;
            for col in col_guess - 1..=col_guess + 1 {
                let dist = tile_center(col, row).distance_squared(point);
                if best.is_none_or(|(_, _, d)| dist < d) {
                    best = Some((col, row, dist));
                }
            }
        }

        // The nearest lattice centre owns the point, even if that tile is
        // outside the map.
        let (col, row, _) = best?;
        let col = usize::try_from(col).ok()?;
        let row = usize::try_from(row).ok()?;
        (col < self.width && row < self.height).then_some((col, row))
    }
}

impl TileMap for HexMap {
    fn tile_at(&mut self, x: f64, y: f64) -> Option<&mut HexTile> {
        let (col, row) = self.locate(DVec2::new(x, y))?;
        self.tiles.get_mut(row * self.width + col)
    }
}

fn circumradius() -> f64 {
    TILE_SIZE / 3f64.sqrt()
}

fn row_spacing() -> f64 {
    1.5 * circumradius()
}

fn row_offset(row: i64) -> f64 {
    if row.rem_euclid(2) == 1 {
        TILE_SIZE / 2.0
    } else {
        0.0
    }
}

fn tile_center(col: i64, row: i64) -> DVec2 {
    DVec2::new(
        col as f64 * TILE_SIZE + row_offset(row),
        row as f64 * row_spacing(),
    )
}
