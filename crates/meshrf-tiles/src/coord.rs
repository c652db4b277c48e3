//! Web-Mercator tile addressing.
//!
//! Uses the OpenStreetMap Slippy Map tile naming convention:
//! - `zoom` is the zoom level (0-20)
//! - `x` is the column (0 to 2^zoom - 1, from west to east)
//! - `y` is the row (0 to 2^zoom - 1, from north to south)
//!
//! Columns wrap around the antimeridian; rows do not wrap, so neighbour
//! lookups past the poles produce no tile at all.

use crate::{Result, TileError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Maximum zoom level accepted for tile addressing.
pub const MAX_ZOOM: u8 = 20;

/// Latitude limit of the Web-Mercator projection (arctan(sinh(π)), rounded).
pub const MERCATOR_MAX_LAT: f64 = 85.0511;

/// Equatorial circumference of the earth used for tile widths, in meters.
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_017.0;

/// WGS84 equatorial radius, in meters.
pub const WGS84_EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;

/// Geographic point in degrees, with an optional height above ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Height above ground in meters, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_m: Option<f64>,
}

impl GeoPoint {
    /// Create a point without a height.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            height_m: None,
        }
    }

    /// Attach a height above ground.
    pub fn with_height(mut self, height_m: f64) -> Self {
        self.height_m = Some(height_m);
        self
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// Geographic bounding box in degrees.
///
/// Longitudes are not normalized: a box built around the antimeridian may
/// extend past ±180°.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileBounds {
    /// Western edge longitude.
    pub west: f64,
    /// Northern edge latitude.
    pub north: f64,
    /// Eastern edge longitude.
    pub east: f64,
    /// Southern edge latitude.
    pub south: f64,
}

impl TileBounds {
    /// Check whether a coordinate falls within the box.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    /// Column, 0 at 180°W, increases eastward.
    pub x: u32,
    /// Row, 0 at ~85.05°N, increases southward.
    pub y: u32,
    /// Zoom level.
    pub zoom: u8,
}

impl TileAddress {
    /// Tile containing a coordinate.
    ///
    /// Latitude is clamped to the Mercator limit and the column wraps modulo
    /// 2^zoom, so ±180° both resolve to column 0.
    pub fn from_lat_lon(lat: f64, lon: f64, zoom: u8) -> Result<Self> {
        check_zoom(zoom)?;
        let (fx, fy) = fractional_tile(lat, lon, zoom);
        let n = tiles_per_axis(zoom) as i64;
        let x = (fx.floor() as i64).rem_euclid(n);
        let y = (fy.floor() as i64).clamp(0, n - 1);
        Ok(Self {
            x: x as u32,
            y: y as u32,
            zoom,
        })
    }

    /// Normalize an unwrapped tile coordinate.
    ///
    /// The column wraps; a row outside `[0, 2^zoom - 1]` has no tile and
    /// yields `None`.
    pub fn wrapped(x: i64, y: i64, zoom: u8) -> Option<Self> {
        if zoom > MAX_ZOOM {
            return None;
        }
        let n = tiles_per_axis(zoom) as i64;
        if y < 0 || y >= n {
            return None;
        }
        Some(Self {
            x: x.rem_euclid(n) as u32,
            y: y as u32,
            zoom,
        })
    }

    /// Neighbouring tile `dx` columns east and `dy` rows south.
    pub fn offset(&self, dx: i64, dy: i64) -> Option<Self> {
        Self::wrapped(self.x as i64 + dx, self.y as i64 + dy, self.zoom)
    }

    /// Geographic bounds of this tile.
    pub fn bounds(&self) -> TileBounds {
        unwrapped_bounds(self.x as i64, self.y as i64, 1, 1, self.zoom)
    }

    /// Expand a URL template containing `{z}`, `{x}` and `{y}` placeholders.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.zoom.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Reject zoom levels outside the supported range.
pub fn check_zoom(zoom: u8) -> Result<()> {
    if zoom > MAX_ZOOM {
        return Err(TileError::InvalidZoomLevel(zoom));
    }
    Ok(())
}

/// Number of tiles along one axis at a zoom level.
pub fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << zoom
}

/// Fractional tile coordinate of a point.
///
/// Uses the OpenStreetMap Slippy Map tiling formula without flooring:
/// - x = 2^z · (lon + 180) / 360
/// - y = 2^z · (1 - ln(tan(lat) + sec(lat)) / π) / 2
pub fn fractional_tile(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = tiles_per_axis(zoom) as f64;
    let lat_rad = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    let x = n * (lon + 180.0) / 360.0;
    let y = n * (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Wrap a longitude into `[-180, 180)`.
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed longitude difference from `from` to `to`, taken the short way
/// around, in `[-180, 180)`.
pub fn longitude_delta(from: f64, to: f64) -> f64 {
    wrap_longitude(to - from)
}

/// Number of tiles to fetch on each side of the center tile so that a disk of
/// `radius_m` around `center_lat` is covered.
///
/// Computed as `ceil(radius / tile_width) + 1` where the tile width shrinks
/// with `cos(lat)`. Never less than 1 and a non-finite or non-positive radius
/// yields 1. Above zoom 1 the result is capped at `(2^zoom - 1) / 2`, so the
/// `2r + 1` columns of the block never hold the same tile twice.
pub fn required_tile_radius(center_lat: f64, zoom: u8, radius_m: f64) -> u32 {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return 1;
    }
    let lat_rad = center_lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    let n = tiles_per_axis(zoom);
    let tile_width_m = lat_rad.cos() * EARTH_CIRCUMFERENCE_M / n as f64;
    let cap = ((n - 1) / 2).max(1) as f64;
    let radius = (radius_m / tile_width_m).ceil() + 1.0;
    radius.min(cap).max(1.0) as u32
}

/// Ground distance covered by one pixel, in meters.
pub fn ground_sample_distance(lat: f64, zoom: u8, tile_size: u32) -> f64 {
    let lat_rad = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    2.0 * PI * WGS84_EQUATORIAL_RADIUS_M * lat_rad.cos()
        / (tile_size as f64 * tiles_per_axis(zoom) as f64)
}

/// Geographic bounds of the `(2r+1) × (2r+1)` tile block centred on `center`.
///
/// The block is not wrapped, so near the antimeridian the west or east edge
/// lies beyond ±180°.
pub fn stitched_bounds(center: TileAddress, tile_radius: u32) -> TileBounds {
    let r = tile_radius as i64;
    let span = 2 * r + 1;
    unwrapped_bounds(
        center.x as i64 - r,
        center.y as i64 - r,
        span,
        span,
        center.zoom,
    )
}

fn unwrapped_bounds(x: i64, y: i64, cols: i64, rows: i64, zoom: u8) -> TileBounds {
    let n = tiles_per_axis(zoom) as f64;
    let lon = |x: i64| x as f64 / n * 360.0 - 180.0;
    let lat = |y: i64| (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();
    TileBounds {
        west: lon(x),
        north: lat(y),
        east: lon(x + cols),
        south: lat(y + rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_tile_address_equator() {
        let t = TileAddress::from_lat_lon(0.0, 0.0, 12).unwrap();
        assert_eq!(t.x, 2048);
        assert_eq!(t.y, 2048);
        assert_eq!(t.zoom, 12);
    }

    #[test]
    fn test_zoom_zero_is_single_tile() {
        let t = TileAddress::from_lat_lon(47.6, -122.3, 0).unwrap();
        assert_eq!((t.x, t.y), (0, 0));
    }

    #[test]
    fn test_invalid_zoom() {
        assert!(matches!(
            TileAddress::from_lat_lon(0.0, 0.0, MAX_ZOOM + 1),
            Err(TileError::InvalidZoomLevel(_))
        ));
    }

    #[test]
    fn test_antimeridian_longitudes_wrap_to_column_zero() {
        let east = TileAddress::from_lat_lon(10.0, 180.0, 5).unwrap();
        let west = TileAddress::from_lat_lon(10.0, -180.0, 5).unwrap();
        assert_eq!(east.x, 0);
        assert_eq!(west.x, 0);
    }

    #[test]
    fn test_polar_latitudes_are_clamped() {
        let north = TileAddress::from_lat_lon(89.9, 0.0, 6).unwrap();
        let south = TileAddress::from_lat_lon(-89.9, 0.0, 6).unwrap();
        assert_eq!(north.y, 0);
        assert_eq!(south.y, 63);
    }

    #[test]
    fn test_wrapped_column() {
        let t = TileAddress::wrapped(-1, 10, 5).unwrap();
        assert_eq!(t.x, 31);
        let t = TileAddress::wrapped(32, 10, 5).unwrap();
        assert_eq!(t.x, 0);
    }

    #[test]
    fn test_wrapped_row_out_of_range() {
        assert!(TileAddress::wrapped(3, -1, 5).is_none());
        assert!(TileAddress::wrapped(3, 32, 5).is_none());
    }

    #[test]
    fn test_roundtrip_bounds_contain_point() {
        let test_points = [
            (47.6062, -122.3321), // Seattle
            (40.7128, -74.0060),  // New York
            (51.5074, -0.1278),   // London
            (-33.8688, 151.2093), // Sydney
        ];

        for (lat, lon) in test_points {
            let tile = TileAddress::from_lat_lon(lat, lon, 12).unwrap();
            let bounds = tile.bounds();
            assert!(
                bounds.contains(lat, lon),
                "{} not in bounds of tile {}: {:?}",
                GeoPoint::new(lat, lon),
                tile,
                bounds
            );
        }
    }

    #[test]
    fn test_url_template() {
        let t = TileAddress { x: 5, y: 7, zoom: 3 };
        assert_eq!(t.url("https://tiles/{z}/{x}/{y}.png"), "https://tiles/3/5/7.png");
        assert_eq!(t.to_string(), "3/5/7");
    }

    #[test]
    fn test_radius_examples() {
        // One tile at zoom 12 on the equator is ~9.78 km wide.
        assert_eq!(required_tile_radius(0.0, 12, 5_000.0), 2);
        assert_eq!(required_tile_radius(0.0, 12, 10_000.0), 3);
    }

    #[test]
    fn test_radius_degenerate_inputs() {
        assert_eq!(required_tile_radius(45.0, 12, 0.0), 1);
        assert_eq!(required_tile_radius(45.0, 12, -10.0), 1);
        assert_eq!(required_tile_radius(45.0, 12, f64::NAN), 1);
        assert_eq!(required_tile_radius(45.0, 12, f64::INFINITY), 1);
    }

    #[test]
    fn test_radius_block_never_wider_than_world() {
        assert_eq!(required_tile_radius(0.0, 3, 1.0e9), 3);
        assert_eq!(required_tile_radius(0.0, 0, 1.0e9), 1);
        assert_eq!(required_tile_radius(0.0, 1, 1.0e9), 1);
        for zoom in 2..=MAX_ZOOM {
            let r = required_tile_radius(0.0, zoom, 1.0e12) as u64;
            assert!(2 * r + 1 <= tiles_per_axis(zoom), "zoom {} spans {}", zoom, 2 * r + 1);
        }
    }

    #[test]
    fn test_longitude_wrapping() {
        assert_abs_diff_eq!(wrap_longitude(190.0), -170.0, epsilon = 1e-9);
        assert_abs_diff_eq!(wrap_longitude(-190.0), 170.0, epsilon = 1e-9);
        assert_abs_diff_eq!(wrap_longitude(180.0), -180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(longitude_delta(179.99, -179.99), 0.02, epsilon = 1e-9);
        assert_abs_diff_eq!(longitude_delta(-179.99, 179.99), -0.02, epsilon = 1e-9);
        assert_abs_diff_eq!(longitude_delta(10.0, 20.0), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_radius_monotonic_in_latitude() {
        let mut previous = 0;
        for lat in (0..=80).step_by(5) {
            let r = required_tile_radius(lat as f64, 12, 20_000.0);
            assert!(r >= previous, "radius shrank at lat {}", lat);
            previous = r;
            let mirrored = required_tile_radius(-(lat as f64), 12, 20_000.0);
            assert_eq!(r, mirrored);
        }
    }

    #[test]
    fn test_ground_sample_distance() {
        let gsd = ground_sample_distance(0.0, 12, 256);
        assert_relative_eq!(gsd, 38.2185, epsilon = 1e-3);
        let gsd_60 = ground_sample_distance(60.0, 12, 256);
        assert_relative_eq!(gsd_60, gsd / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stitched_bounds_single_tile_matches_tile_bounds() {
        let center = TileAddress::from_lat_lon(47.6, -122.3, 10).unwrap();
        assert_eq!(stitched_bounds(center, 0), center.bounds());
    }

    #[test]
    fn test_stitched_bounds_span() {
        let center = TileAddress { x: 16, y: 16, zoom: 5 };
        let b = stitched_bounds(center, 1);
        let tile_deg = 360.0 / 32.0;
        assert_relative_eq!(b.west, 15.0 * tile_deg - 180.0, epsilon = 1e-9);
        assert_relative_eq!(b.east, 18.0 * tile_deg - 180.0, epsilon = 1e-9);
        assert!(b.north > 0.0 && b.south < 0.0);
    }

    #[test]
    fn test_stitched_bounds_extend_past_antimeridian() {
        let center = TileAddress { x: 0, y: 10, zoom: 5 };
        let b = stitched_bounds(center, 1);
        assert!(b.west < -180.0);
    }
}
