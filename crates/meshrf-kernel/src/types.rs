//! Type definitions for engine jobs, parameters and results

use crate::ffi;
use crate::{KernelError, KernelResult};
use serde::{Deserialize, Serialize};

/// Loss reported by the engine for a profile sample it could not evaluate.
pub const FAILED_SAMPLE_LOSS_DB: f32 = 999.9;

/// Radio climate classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum Climate {
    /// Equatorial climate
    Equatorial = 1,
    /// Continental Subtropical climate
    ContinentalSubtropical = 2,
    /// Maritime Subtropical climate
    MaritimeSubtropical = 3,
    /// Desert climate
    Desert = 4,
    /// Continental Temperate climate
    ContinentalTemperate = 5,
    /// Maritime Temperate Over Land climate
    MaritimeTemperateOverLand = 6,
    /// Maritime Temperate Over Sea climate
    MaritimeTemperateOverSea = 7,
}

/// Polarization of the radio signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum Polarization {
    /// Horizontal polarization
    Horizontal = 0,
    /// Vertical polarization
    Vertical = 1,
}

/// Common ground constants as (epsilon, sigma)
pub mod ground_constants {
    /// Average ground
    pub const AVERAGE_GROUND: (f64, f64) = (15.0, 0.005);
    /// Poor ground
    pub const POOR_GROUND: (f64, f64) = (4.0, 0.001);
    /// Good ground
    pub const GOOD_GROUND: (f64, f64) = (25.0, 0.02);
    /// Sea water
    pub const SEA_WATER: (f64, f64) = (81.0, 5.0);
}

/// Parameters for a radial path-loss computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelParameters {
    /// Carrier frequency in MHz
    pub frequency_mhz: f64,
    /// Transmitter antenna height above ground in meters
    pub tx_height_m: f64,
    /// Receiver antenna height above ground in meters
    pub rx_height_m: f64,
    /// Antenna polarization
    pub polarization: Polarization,
    /// Distance between consecutive profile samples in meters
    pub step_size_m: f64,
    /// Surface refractivity in N-Units
    pub surface_refractivity: f64,
    /// Relative permittivity of the ground
    pub ground_permittivity: f64,
    /// Ground conductivity in S/m
    pub ground_conductivity: f64,
    /// Radio climate
    pub climate: Climate,
}

impl Default for KernelParameters {
    fn default() -> Self {
        let (epsilon, sigma) = ground_constants::AVERAGE_GROUND;
        Self {
            frequency_mhz: 910.525,
            tx_height_m: 2.0,
            rx_height_m: 2.0,
            polarization: Polarization::Vertical,
            step_size_m: 30.0,
            surface_refractivity: 301.0,
            ground_permittivity: epsilon,
            ground_conductivity: sigma,
            climate: Climate::ContinentalTemperate,
        }
    }
}

impl KernelParameters {
    /// Convert to the C layout expected by the engine.
    pub fn to_ffi(&self) -> ffi::LinkParameters {
        ffi::LinkParameters {
            frequency_mhz: self.frequency_mhz,
            tx_height_m: self.tx_height_m,
            rx_height_m: self.rx_height_m,
            polarization: self.polarization as i32,
            step_size_m: self.step_size_m,
            N_0: self.surface_refractivity,
            epsilon: self.ground_permittivity,
            sigma: self.ground_conductivity,
            climate: self.climate as i32,
        }
    }
}

/// A viewshed computation handed to the engine.
///
/// The elevation buffer is owned by the job; once a job is built the grid it
/// came from is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewshedJob {
    /// Row-major elevation grid in meters
    pub elevation: Vec<f32>,
    pub width: usize,
    pub height: usize,
    /// Observer column
    pub observer_x: i32,
    /// Observer row
    pub observer_y: i32,
    /// Observer height above ground in meters
    pub observer_height_m: f32,
    /// Analysis radius in pixels
    pub max_distance_px: i32,
    /// Ground sample distance in meters per pixel
    pub gsd_m: f32,
}

impl ViewshedJob {
    /// Check the job is well formed before it crosses the boundary.
    pub fn validate(&self) -> KernelResult<()> {
        if self.elevation.is_empty() {
            return Err(KernelError::InvalidJob("elevation buffer is empty".to_string()));
        }
        if self.width * self.height != self.elevation.len() {
            return Err(KernelError::InvalidJob(format!(
                "{}x{} grid does not match {} samples",
                self.width,
                self.height,
                self.elevation.len()
            )));
        }
        if self.width > i32::MAX as usize || self.height > i32::MAX as usize {
            return Err(KernelError::InvalidDimensions);
        }
        let inside = self.observer_x >= 0
            && self.observer_y >= 0
            && (self.observer_x as usize) < self.width
            && (self.observer_y as usize) < self.height;
        if !inside {
            return Err(KernelError::ObserverOutOfBounds);
        }
        Ok(())
    }
}

/// Per-cell visibility, one byte per grid cell, nonzero meaning visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityMask {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl VisibilityMask {
    /// Wrap an engine output buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> KernelResult<Self> {
        if data.len() != width * height {
            return Err(KernelError::InvalidDimensions);
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the cell at `(x, y)` is visible. Cells outside the grid are not.
    pub fn is_visible(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x] != 0
    }

    /// Number of visible cells.
    pub fn visible_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Raw mask bytes in row-major order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
