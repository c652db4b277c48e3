//! # meshrf-link
//!
//! Point-to-point radio link analysis over a terrain profile.
//!
//! Given elevations sampled along the straight path between two radios, this
//! crate works out:
//! - The line of sight between the antenna tips
//! - First Fresnel zone radius and earth bulge at every sample
//! - Whether terrain (plus clutter) intrudes into the Fresnel zone
//! - Path loss, received signal strength and margin
//! - A [`LinkQuality`] verdict
//!
//! ## Example
//!
//! ```
//! use meshrf_link::{analyze_link, LinkAnalysisParams, LinkConfig, LinkQuality, TerrainSample};
//!
//! let profile: Vec<TerrainSample> = (0..=100)
//!     .map(|i| TerrainSample::new(i as f64 * 100.0, 50.0))
//!     .collect();
//! let config = LinkConfig {
//!     frequency_mhz: 915.0,
//!     tx_antenna_height_m: 10.0,
//!     rx_antenna_height_m: 10.0,
//!     ..Default::default()
//! };
//!
//! let analysis = analyze_link(&profile, &config, &LinkAnalysisParams::default(), None)?;
//! assert!(!analysis.profile.is_obstructed);
//! println!("{}: {:.1} dB margin", analysis.quality, analysis.budget.margin_db);
//! # Ok::<(), meshrf_link::LinkAnalysisError>(())
//! ```
//!
//! Terrain-aware path loss ([`PropagationModel::Terrain`]) needs a
//! [`meshrf_kernel::Kernel`]; free-space analysis does not.

mod budget;
mod config;
mod params;
pub mod presets;
mod profile;

pub use budget::{
    compute_link_budget, free_space_path_loss, path_loss, receiver_sensitivity, LinkBudget,
    PredictionMethod, THERMAL_NOISE_DBM_HZ,
};
pub use config::LinkConfig;
pub use params::{LinkAnalysisParams, LinkQuality, PropagationModel};
pub use profile::{
    analyze_profile, earth_bulge, fresnel_radius, LinkProfileSample, ProfileAnalysis,
    TerrainInfo, TerrainSample,
};

use meshrf_kernel::{Kernel, KernelError};
use thiserror::Error;
use tracing::debug;

/// Errors from link analysis.
#[derive(Debug, Error)]
pub enum LinkAnalysisError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Terrain propagation model needs a kernel")]
    KernelRequired,

    #[error("Engine could not evaluate path loss over {distance_m:.0} m")]
    PathLossUnavailable { distance_m: f64 },

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// Result type for link analysis.
pub type Result<T> = std::result::Result<T, LinkAnalysisError>;

/// Headline numbers for a link.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkBudgetResult {
    pub rssi_dbm: f64,
    pub margin_db: f64,
    pub min_clearance_m: f64,
    pub is_obstructed: bool,
    pub quality: LinkQuality,
}

/// Full result of [`analyze_link`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkAnalysis {
    pub profile: ProfileAnalysis,
    pub budget: LinkBudget,
    pub quality: LinkQuality,
}

impl LinkAnalysis {
    pub fn summary(&self) -> LinkBudgetResult {
        LinkBudgetResult {
            rssi_dbm: self.budget.rssi_dbm,
            margin_db: self.budget.margin_db,
            min_clearance_m: self.profile.min_clearance_m,
            is_obstructed: self.profile.is_obstructed,
            quality: self.quality,
        }
    }
}

/// Analyze a link over an ordered terrain profile.
///
/// The first and last samples are the transmitter and receiver. `kernel` is
/// only consulted for [`PropagationModel::Terrain`].
pub fn analyze_link(
    profile: &[TerrainSample],
    config: &LinkConfig,
    params: &LinkAnalysisParams,
    kernel: Option<&dyn Kernel>,
) -> Result<LinkAnalysis> {
    let geometry = analyze_profile(profile, config, params)?;

    let elevations: Vec<f32> = profile.iter().map(|s| s.elevation_m as f32).collect();
    let (loss_db, method) = path_loss(geometry.distance_m, &elevations, config, params, kernel)?;
    let budget = compute_link_budget(loss_db, method, config, params);
    let quality = params.classify_link(budget.margin_db, geometry.is_obstructed);

    debug!(
        distance_m = geometry.distance_m,
        path_loss_db = loss_db,
        %method,
        margin_db = budget.margin_db,
        min_clearance_m = geometry.min_clearance_m,
        obstructed = geometry.is_obstructed,
        "Link analyzed"
    );

    Ok(LinkAnalysis {
        profile: geometry,
        budget,
        quality,
    })
}
