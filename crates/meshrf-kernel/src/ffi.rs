//! FFI bindings to the native engine library
//!
//! Both entry points write into caller-allocated buffers and return a status
//! code, 0 on success. Nonzero codes map through [`KernelError::from_code`].
//!
//! [`KernelError::from_code`]: crate::KernelError::from_code

#![allow(non_snake_case)]

/// Viewshed entry point symbol.
pub const VIEWSHED_SYMBOL: &[u8] = b"meshrf_calculate_viewshed\0";

/// Radial path-loss entry point symbol.
pub const RADIAL_LOSS_SYMBOL: &[u8] = b"meshrf_calculate_radial_loss\0";

/// Link parameters structure matching the C struct
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LinkParameters {
    pub frequency_mhz: f64,
    pub tx_height_m: f64,
    pub rx_height_m: f64,
    /// 0 = horizontal, 1 = vertical
    pub polarization: i32,
    /// Distance between profile samples
    pub step_size_m: f64,
    /// Surface refractivity in N-Units
    pub N_0: f64,
    /// Relative permittivity of the ground
    pub epsilon: f64,
    /// Ground conductivity in S/m
    pub sigma: f64,
    /// Radio climate code (1-7)
    pub climate: i32,
}

/// meshrf_calculate_viewshed - binary visibility over a row-major elevation grid
///
/// `visibility` must hold `width * height` bytes; each is set to 0 or 1.
pub type FnCalculateViewshed = unsafe extern "C" fn(
    elevation: *const f32,
    width: i32,
    height: i32,
    tx_x: i32,
    tx_y: i32,
    tx_h_meters: f32,
    max_dist_pixels: i32,
    gsd_meters: f32,
    visibility: *mut u8,
) -> i32;

/// meshrf_calculate_radial_loss - path loss in dB for every sample of a profile
///
/// `loss_db` must hold `profile_length` floats. Index 0 is the transmitter.
pub type FnCalculateRadialLoss = unsafe extern "C" fn(
    terrain_profile: *const f32,
    profile_length: i32,
    params: *const LinkParameters,
    loss_db: *mut f32,
) -> i32;
