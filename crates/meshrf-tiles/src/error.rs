//! Error types for the tiles crate.

use crate::coord::{TileAddress, MAX_ZOOM};
use thiserror::Error;

/// Errors that can occur when fetching, decoding or sampling elevation tiles.
#[derive(Debug, Error)]
pub enum TileError {
    /// Invalid zoom level.
    #[error("Invalid zoom level {0} (must be 0-{max})", max = MAX_ZOOM)]
    InvalidZoomLevel(u8),

    /// HTTP request error when fetching tiles.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The tile server answered but did not hand back a tile.
    #[error("Failed to download tile {address}: {reason}")]
    TileDownloadFailed {
        /// Tile that was requested.
        address: TileAddress,
        /// Reason for failure.
        reason: String,
    },

    /// Raster image could not be decoded or encoded.
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Decoded raster does not match the shape of an elevation tile.
    #[error("Invalid tile {address}: {reason}")]
    InvalidTile {
        /// Tile the raster belongs to.
        address: TileAddress,
        /// What is wrong with it.
        reason: String,
    },

    /// No elevation data is available for a coordinate.
    #[error("No elevation data at coordinate ({lat}, {lon})")]
    NoData {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },

    /// Profile request cannot be satisfied.
    #[error("Invalid profile request: {0}")]
    InvalidProfile(String),
}
