//! Stitching a block of tiles into one elevation grid.

use crate::coord::{stitched_bounds, GeoPoint, TileAddress, TileBounds};
use crate::decode::ElevationTile;
use crate::project::{project_point, ObserverProjection};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Value left in the grid where a tile is missing.
pub const FILL_VALUE: f32 = 0.0;

/// A `(2r+1)·tileSize` square elevation grid assembled from neighbouring tiles.
#[derive(Debug, Clone)]
pub struct StitchedGrid {
    /// Row-major elevation samples.
    data: Vec<f32>,
    side: usize,
    center: TileAddress,
    tile_radius: u32,
    tile_size: u32,
    tiles_placed: usize,
}

impl StitchedGrid {
    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.side
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.side
    }

    /// Tile the block is centred on.
    pub fn center(&self) -> TileAddress {
        self.center
    }

    /// Number of tiles on each side of the center tile.
    pub fn tile_radius(&self) -> u32 {
        self.tile_radius
    }

    /// Edge length of one tile in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// How many tiles were copied into the grid.
    pub fn tiles_placed(&self) -> usize {
        self.tiles_placed
    }

    /// Row-major elevation samples.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Elevation at a grid pixel, or `None` outside the grid.
    pub fn value_at(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.side || y >= self.side {
            return None;
        }
        Some(self.data[y * self.side + x])
    }

    /// Geographic bounds covered by the grid.
    pub fn bounds(&self) -> TileBounds {
        stitched_bounds(self.center, self.tile_radius)
    }

    /// Position of a coordinate in grid pixels.
    pub fn project(&self, point: &GeoPoint) -> ObserverProjection {
        project_point(
            point.lat,
            point.lon,
            self.center,
            self.tile_size,
            self.tile_radius,
        )
    }

    /// Consume the grid, returning its samples.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Assemble fetched tiles around `center` into a single grid.
///
/// The tile at offset `(dx, dy)` from the center lands at destination pixel
/// `((dx + r)·tileSize, (dy + r)·tileSize)`. Offsets whose tile is absent, or
/// whose tile has the wrong dimensions, stay at [`FILL_VALUE`].
pub fn stitch_tiles<I>(tiles: I, center: TileAddress, tile_radius: u32, tile_size: u32) -> StitchedGrid
where
    I: IntoIterator<Item = ElevationTile>,
{
    let by_address: HashMap<TileAddress, ElevationTile> = tiles
        .into_iter()
        .map(|tile| (tile.address(), tile))
        .collect();

    let ts = tile_size as usize;
    let span = 2 * tile_radius as usize + 1;
    let side = span * ts;
    let mut data = vec![FILL_VALUE; side * side];
    let mut tiles_placed = 0;

    let r = tile_radius as i64;
    for dy in -r..=r {
        for dx in -r..=r {
            let Some(tile) = center
                .offset(dx, dy)
                .and_then(|address| by_address.get(&address))
            else {
                continue;
            };

            if tile.width() != tile_size || tile.height() != tile_size {
                warn!(
                    tile = %tile.address(),
                    width = tile.width(),
                    height = tile.height(),
                    expected = tile_size,
                    "Skipping tile with unexpected dimensions"
                );
                continue;
            }

            let dest_x = (dx + r) as usize * ts;
            let dest_y = (dy + r) as usize * ts;
            for (row, src) in tile.data().chunks_exact(ts).enumerate() {
                let start = (dest_y + row) * side + dest_x;
                data[start..start + ts].copy_from_slice(src);
            }
            tiles_placed += 1;
        }
    }

    debug!(
        center = %center,
        tile_radius,
        side,
        tiles_placed,
        "Stitched elevation grid"
    );

    StitchedGrid {
        data,
        side,
        center,
        tile_radius,
        tile_size,
        tiles_placed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: u32 = 4;

    fn center() -> TileAddress {
        TileAddress { x: 10, y: 10, zoom: 5 }
    }

    #[test]
    fn test_dimensions() {
        let grid = stitch_tiles(Vec::new(), center(), 2, TS);
        assert_eq!(grid.width(), 20);
        assert_eq!(grid.height(), 20);
        assert_eq!(grid.data().len(), 400);
        assert_eq!(grid.tiles_placed(), 0);
        assert!(grid.data().iter().all(|&v| v == FILL_VALUE));
    }

    #[test]
    fn test_single_tile_at_offset_east() {
        let east = center().offset(1, 0).unwrap();
        let grid = stitch_tiles(vec![ElevationTile::filled(east, TS, 500.0)], center(), 1, TS);

        // Columns 8..12 of rows 4..8 hold the tile; everything else is fill.
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let expected = if (8..12).contains(&x) && (4..8).contains(&y) {
                    500.0
                } else {
                    FILL_VALUE
                };
                assert_eq!(grid.value_at(x, y), Some(expected), "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_rows_are_copied_in_order() {
        let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let tile = ElevationTile::new(center(), TS, TS, data).unwrap();
        let grid = stitch_tiles(vec![tile], center(), 1, TS);
        assert_eq!(grid.value_at(4, 4), Some(0.0));
        assert_eq!(grid.value_at(7, 4), Some(3.0));
        assert_eq!(grid.value_at(4, 5), Some(4.0));
        assert_eq!(grid.value_at(7, 7), Some(15.0));
    }

    #[test]
    fn test_wrong_size_tile_is_skipped() {
        let grid = stitch_tiles(vec![ElevationTile::filled(center(), 3, 1.0)], center(), 0, TS);
        assert_eq!(grid.tiles_placed(), 0);
    }

    #[test]
    fn test_wrapped_neighbour_is_placed() {
        let center = TileAddress { x: 0, y: 10, zoom: 5 };
        let west = TileAddress { x: 31, y: 10, zoom: 5 };
        let grid = stitch_tiles(vec![ElevationTile::filled(west, TS, 7.0)], center, 1, TS);
        assert_eq!(grid.tiles_placed(), 1);
        assert_eq!(grid.value_at(0, 4), Some(7.0));
    }

    #[test]
    fn test_rows_past_pole_stay_empty() {
        let center = TileAddress { x: 3, y: 0, zoom: 3 };
        let grid = stitch_tiles(vec![ElevationTile::filled(center, TS, 9.0)], center, 1, TS);
        assert_eq!(grid.tiles_placed(), 1);
        assert!(grid.data()[..grid.width() * TS as usize]
            .iter()
            .all(|&v| v == FILL_VALUE));
    }
}
