//! Terrain-RGB elevation tiles.
//!
//! Each pixel packs a height into its three color channels:
//!
//! ```text
//! elevation_m = -10000 + (R * 65536 + G * 256 + B) * 0.1
//! ```
//!
//! The alpha channel, when present, is ignored.

use crate::coord::TileAddress;
use crate::{Result, TileError};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Elevation of an all-zero pixel, in meters.
pub const ELEVATION_OFFSET_M: f64 = -10_000.0;

/// Height represented by one step of the packed 24-bit value, in meters.
pub const ELEVATION_STEP_M: f64 = 0.1;

/// Largest packed value representable in three 8-bit channels.
const MAX_PACKED: f64 = 16_777_215.0;

/// A decoded elevation tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationTile {
    address: TileAddress,
    /// Elevation data in row-major order (north to south, west to east).
    data: Vec<f32>,
    width: u32,
    height: u32,
}

impl ElevationTile {
    /// Wrap a row-major elevation grid.
    pub fn new(address: TileAddress, width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected || expected == 0 {
            return Err(TileError::InvalidTile {
                address,
                reason: format!(
                    "expected {}x{} = {} samples, got {}",
                    width,
                    height,
                    expected,
                    data.len()
                ),
            });
        }
        Ok(Self {
            address,
            data,
            width,
            height,
        })
    }

    /// A square tile with every sample set to `elevation_m`.
    pub fn filled(address: TileAddress, size: u32, elevation_m: f32) -> Self {
        Self {
            address,
            data: vec![elevation_m; size as usize * size as usize],
            width: size,
            height: size,
        }
    }

    /// Address this tile was fetched for.
    pub fn address(&self) -> TileAddress {
        self.address
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major elevation samples in meters.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Elevation at a pixel, or `None` outside the tile.
    pub fn elevation_at(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get((row * self.width + col) as usize).copied()
    }

    /// Bilinearly interpolated elevation at a position inside the tile.
    ///
    /// `u` runs west to east and `v` north to south, both in `[0, 1]` across
    /// the tile's outer edges. Pixel values sit at pixel centres; positions
    /// within half a pixel of an edge take the edge pixel's value.
    pub fn sample(&self, u: f64, v: f64) -> f32 {
        let x = (u * self.width as f64 - 0.5).clamp(0.0, (self.width - 1) as f64);
        let y = (v * self.height as f64 - 0.5).clamp(0.0, (self.height - 1) as f64);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        let px = |c: u32, r: u32| self.data[(r * self.width + c) as usize] as f64;

        let elevation = px(x0, y0) * (1.0 - fx) * (1.0 - fy)
            + px(x1, y0) * fx * (1.0 - fy)
            + px(x0, y1) * (1.0 - fx) * fy
            + px(x1, y1) * fx * fy;

        elevation as f32
    }

    /// Consume the tile, returning its samples.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Decode one terrain-RGB pixel to meters.
pub fn decode_elevation(r: u8, g: u8, b: u8) -> f32 {
    let packed = (r as u32) << 16 | (g as u32) << 8 | b as u32;
    (ELEVATION_OFFSET_M + packed as f64 * ELEVATION_STEP_M) as f32
}

/// Encode a height in meters as a terrain-RGB pixel.
///
/// Heights are rounded to the nearest 0.1 m and clamped to the representable
/// range.
pub fn encode_elevation(meters: f64) -> [u8; 3] {
    let packed = ((meters - ELEVATION_OFFSET_M) / ELEVATION_STEP_M)
        .round()
        .clamp(0.0, MAX_PACKED) as u32;
    [(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]
}

/// Decode tightly packed RGB pixels into an elevation tile.
pub fn decode_rgb_pixels(
    rgb: &[u8],
    width: u32,
    height: u32,
    address: TileAddress,
) -> Result<ElevationTile> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        return Err(TileError::InvalidTile {
            address,
            reason: format!(
                "expected {} RGB bytes for {}x{}, got {}",
                expected,
                width,
                height,
                rgb.len()
            ),
        });
    }

    let data = rgb
        .chunks_exact(3)
        .map(|px| decode_elevation(px[0], px[1], px[2]))
        .collect();

    ElevationTile::new(address, width, height, data)
}

/// Decode an encoded raster (PNG) in terrain-RGB format.
pub fn decode_terrain_rgb(encoded: &[u8], address: TileAddress) -> Result<ElevationTile> {
    let image = image::load_from_memory(encoded)?.to_rgb8();
    let (width, height) = image.dimensions();
    decode_rgb_pixels(image.as_raw(), width, height, address)
}

/// Encode an elevation tile as a terrain-RGB PNG.
pub fn encode_terrain_rgb(tile: &ElevationTile) -> Result<Vec<u8>> {
    let rgb: Vec<u8> = tile
        .data
        .iter()
        .flat_map(|&m| encode_elevation(m as f64))
        .collect();

    let image =
        RgbImage::from_raw(tile.width, tile.height, rgb).ok_or_else(|| TileError::InvalidTile {
            address: tile.address,
            reason: "pixel buffer does not match dimensions".to_string(),
        })?;

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}
