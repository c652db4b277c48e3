//! # meshrf-tiles
//!
//! Web-Mercator elevation tiles for radio coverage analysis.
//!
//! This crate covers everything between a map coordinate and a grid of
//! elevations:
//! - Slippy-map tile addressing with antimeridian wraparound
//! - Terrain-RGB decoding (`-10000 + (R·65536 + G·256 + B)·0.1` meters)
//! - Stitching a `(2r+1) × (2r+1)` block of tiles into one square grid
//! - Projecting coordinates into stitched-grid pixels
//! - Sampling terrain profiles between two points
//!
//! ## Tile Math
//!
//! At zoom 12 on the equator a 256 px tile is ~9.8 km wide and one pixel is
//! ~38 m. Tile widths shrink with `cos(lat)`, so more tiles are needed to
//! cover the same radius further from the equator:
//!
//! ```
//! use meshrf_tiles::{required_tile_radius, TileAddress};
//!
//! let center = TileAddress::from_lat_lon(47.6062, -122.3321, 12)?;
//! let r = required_tile_radius(47.6062, 12, 5_000.0);
//! assert!(r >= 2);
//! # Ok::<(), meshrf_tiles::TileError>(())
//! ```
//!
//! ## Fetching and Stitching
//!
//! ```no_run
//! use meshrf_tiles::{fetch_elevation_tile, stitch_tiles, HttpTileSource, TileAddress, TileSourceConfig};
//!
//! # async fn run() -> meshrf_tiles::Result<()> {
//! let source = HttpTileSource::new(&TileSourceConfig::default())?;
//! let center = TileAddress::from_lat_lon(47.6062, -122.3321, 12)?;
//! let tile = fetch_elevation_tile(&source, center).await;
//! let grid = stitch_tiles(tile, center, 0, 256);
//! println!("{} x {} grid", grid.width(), grid.height());
//! # Ok(())
//! # }
//! ```

mod coord;
mod decode;
mod error;
mod profile;
mod project;
mod source;
mod stitch;

pub use coord::{
    check_zoom, fractional_tile, ground_sample_distance, longitude_delta, required_tile_radius,
    stitched_bounds, tiles_per_axis, wrap_longitude, GeoPoint, TileAddress, TileBounds, EARTH_CIRCUMFERENCE_M, MAX_ZOOM,
    MERCATOR_MAX_LAT, WGS84_EQUATORIAL_RADIUS_M,
};
pub use decode::{
    decode_elevation, decode_rgb_pixels, decode_terrain_rgb, encode_elevation,
    encode_terrain_rgb, ElevationTile, ELEVATION_OFFSET_M, ELEVATION_STEP_M,
};
pub use error::TileError;
pub use profile::{haversine_distance, sample_profile, ProfilePoint, EARTH_RADIUS_M};
pub use project::{project_point, ObserverProjection};
pub use source::{
    fetch_elevation_tile, DownloadStats, HttpTileSource, TileSource, TileSourceConfig,
    DEFAULT_TILE_SIZE, DEFAULT_TILE_URL,
};
pub use stitch::{stitch_tiles, StitchedGrid, FILL_VALUE};

/// Result type for tile operations.
pub type Result<T> = std::result::Result<T, TileError>;
