//! Grid cell addressing for the tiles kept around the player.

use bevy::prelude::*;

use super::geo::{BoundsError, GeoBounds};

/// Identifies a `tile_size`-aligned square cell. `x`/`z` count whole tiles
/// from the projection origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub struct CellKey {
    /// Tile column (easting / `tile_size`).
    pub x: i64,
    /// Tile row (northing / `tile_size`).
    pub z: i64,
}

impl CellKey {
    /// Cell containing the world position `(x, z)`.
    ///
    /// Snaps down with `x - x.rem_euclid(tile_size)`, so points exactly on a
    /// boundary belong to the cell that starts there and negative coordinates
    /// snap toward negative infinity.
    pub fn containing(x: f64, z: f64, tile_size: f64) -> Self {
        let snap = |v: f64| ((v - v.rem_euclid(tile_size)) / tile_size).round() as i64;
        Self {
            x: snap(x),
            z: snap(z),
        }
    }

    /// The cell `dx` columns east and `dz` rows north of this one.
    pub fn offset(self, dx: i64, dz: i64) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Chebyshev distance in cells, 0 for the cell itself.
    pub fn ring(self, other: CellKey) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        dx.max(dz).try_into().unwrap_or(u32::MAX)
    }

    /// Projected bounds of this cell, exactly `tile_size` on each side.
    pub fn bounds(self, tile_size: f64) -> Result<GeoBounds, BoundsError> {
        let min_x = self.x as f64 * tile_size;
        let min_y = self.z as f64 * tile_size;
        GeoBounds::new(min_x, min_y, min_x + tile_size, min_y + tile_size)
    }
}

/// The 3×3 block of cells centred on `center`, centre first.
pub fn required_cells(center: CellKey) -> impl Iterator<Item = CellKey> {
    std::iter::once(center).chain(
        (-1..=1)
            .flat_map(|dz| (-1..=1).map(move |dx| (dx, dz)))
            .filter(|&(dx, dz)| dx != 0 || dz != 0)
            .map(move |(dx, dz)| center.offset(dx, dz)),
    )
}
