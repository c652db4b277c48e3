//! Projection of geographic coordinates into stitched-grid pixels.

use crate::coord::{fractional_tile, tiles_per_axis, TileAddress};

/// Sub-pixel position inside a stitched grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverProjection {
    /// Column, increasing eastward.
    pub x: f64,
    /// Row, increasing southward.
    pub y: f64,
}

impl ObserverProjection {
    /// Integer pixel containing the position.
    pub fn pixel(&self) -> (i64, i64) {
        (self.x.floor() as i64, self.y.floor() as i64)
    }

    /// Whether the position falls inside a `width × height` grid.
    pub fn is_inside(&self, width: usize, height: usize) -> bool {
        let (x, y) = self.pixel();
        x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height
    }
}

/// Project a coordinate into the grid stitched around `center`.
///
/// `stitched = (fractionalTile - centerIndex + r) · tileSize` on both axes.
/// The column offset is taken the short way around the antimeridian, so a
/// point just west of 180°W still lands left of a center tile at column 0.
pub fn project_point(
    lat: f64,
    lon: f64,
    center: TileAddress,
    tile_size: u32,
    tile_radius: u32,
) -> ObserverProjection {
    let (fx, fy) = fractional_tile(lat, lon, center.zoom);
    let n = tiles_per_axis(center.zoom) as f64;
    let half = n / 2.0;

    let mut dx = fx - center.x as f64;
    if dx >= half {
        dx -= n;
    } else if dx < -half {
        dx += n;
    }
    let dy = fy - center.y as f64;

    let r = tile_radius as f64;
    let ts = tile_size as f64;
    ObserverProjection {
        x: (dx + r) * ts,
        y: (dy + r) * ts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_center_tile_origin_maps_to_block_offset() {
        // North-west corner of the center tile at zoom 2 is (0°, 0°) for x=2,y=2.
        let center = TileAddress { x: 2, y: 2, zoom: 2 };
        let p = project_point(0.0, 0.0, center, 256, 1);
        assert_abs_diff_eq!(p.x, 256.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 256.0, epsilon = 1e-6);
    }

    #[test]
    fn test_point_lands_in_center_tile() {
        let (lat, lon) = (47.6062, -122.3321);
        let center = TileAddress::from_lat_lon(lat, lon, 12).unwrap();
        let p = project_point(lat, lon, center, 256, 3);
        assert!(p.x >= 3.0 * 256.0 && p.x < 4.0 * 256.0);
        assert!(p.y >= 3.0 * 256.0 && p.y < 4.0 * 256.0);
        assert!(p.is_inside(7 * 256, 7 * 256));
    }

    #[test]
    fn test_antimeridian_short_way() {
        let center = TileAddress { x: 0, y: 10, zoom: 5 };
        let p = project_point(10.0, 179.9, center, 256, 1);
        assert!(p.x > 0.0 && p.x < 256.0, "x = {}", p.x);
    }

    #[test]
    fn test_pixel_floors() {
        let p = ObserverProjection { x: 12.7, y: -0.2 };
        assert_eq!(p.pixel(), (12, -1));
        assert!(!p.is_inside(100, 100));
    }
}
