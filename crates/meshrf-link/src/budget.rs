//! Link budget: path loss, received signal and margin.

use crate::{LinkAnalysisError, LinkAnalysisParams, LinkConfig, PropagationModel, Result};
use meshrf_kernel::{Kernel, FAILED_SAMPLE_LOSS_DB};
use tracing::debug;

/// Thermal noise density at room temperature (dBm/Hz).
pub const THERMAL_NOISE_DBM_HZ: f64 = -174.0;

/// The method used for path loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PredictionMethod {
    /// Terrain-aware loss from the numeric engine.
    Terrain,
    /// Free-space path loss.
    FreeSpace,
    /// Co-located endpoints - used when distance is effectively zero.
    Colocated,
}

impl std::fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionMethod::Terrain => write!(f, "Terrain"),
            PredictionMethod::FreeSpace => write!(f, "Free-Space"),
            PredictionMethod::Colocated => write!(f, "Co-located"),
        }
    }
}

/// Received power and margin for a link.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkBudget {
    /// Path loss in dB.
    pub path_loss_db: f64,
    /// How the path loss was obtained.
    pub method: PredictionMethod,
    /// Radiated power after TX cable loss and antenna gain (dBm).
    pub eirp_dbm: f64,
    /// Received signal strength (dBm).
    pub rssi_dbm: f64,
    /// Receiver sensitivity used for the margin (dBm).
    pub sensitivity_dbm: f64,
    /// RSSI above sensitivity (dB).
    pub margin_db: f64,
}

/// Free-space path loss in dB.
///
/// `FSPL = 20·log10(d_km) + 20·log10(f_MHz) + 32.44`
pub fn free_space_path_loss(distance_m: f64, frequency_mhz: f64) -> f64 {
    20.0 * (distance_m / 1000.0).log10() + 20.0 * frequency_mhz.log10() + 32.44
}

/// LoRa receiver sensitivity in dBm.
///
/// `-174 + 10·log10(BW_Hz) + NF + SNR_floor(SF)`
pub fn receiver_sensitivity(
    bandwidth_khz: f64,
    spreading_factor: u8,
    params: &LinkAnalysisParams,
) -> f64 {
    THERMAL_NOISE_DBM_HZ
        + 10.0 * (bandwidth_khz * 1000.0).log10()
        + params.noise_figure_db
        + params.snr_threshold_for_sf(spreading_factor)
}

/// Path loss between the endpoints of a profile.
///
/// Endpoints closer than `fspl_min_distance_m` use the fixed co-located loss.
/// The terrain model asks the kernel for per-sample loss along the profile and
/// keeps the receiver end.
pub fn path_loss(
    distance_m: f64,
    elevations: &[f32],
    config: &LinkConfig,
    params: &LinkAnalysisParams,
    kernel: Option<&dyn Kernel>,
) -> Result<(f64, PredictionMethod)> {
    if distance_m < params.fspl_min_distance_m {
        return Ok((params.colocated_path_loss_db, PredictionMethod::Colocated));
    }

    match params.propagation_model {
        PropagationModel::FreeSpace => Ok((
            free_space_path_loss(distance_m, config.frequency_mhz),
            PredictionMethod::FreeSpace,
        )),
        PropagationModel::Terrain => {
            let kernel = kernel.ok_or(LinkAnalysisError::KernelRequired)?;
            if elevations.len() < 2 {
                return Err(LinkAnalysisError::InvalidProfile(
                    "terrain model needs at least 2 samples".to_string(),
                ));
            }

            let mut kernel_params = params.kernel.clone();
            kernel_params.frequency_mhz = config.frequency_mhz;
            kernel_params.tx_height_m = config.tx_antenna_height_m;
            kernel_params.rx_height_m = config.rx_antenna_height_m;
            kernel_params.step_size_m = distance_m / (elevations.len() - 1) as f64;

            let losses = kernel.compute_path_loss(elevations, &kernel_params)?;
            let loss = *losses.last().ok_or(LinkAnalysisError::PathLossUnavailable {
                distance_m,
            })?;
            if loss >= FAILED_SAMPLE_LOSS_DB {
                return Err(LinkAnalysisError::PathLossUnavailable { distance_m });
            }

            debug!(distance_m, loss_db = loss, "Terrain path loss");
            Ok((loss as f64, PredictionMethod::Terrain))
        }
    }
}

/// Compute received power and margin for a given path loss.
///
/// `rssi = P_tx + G_tx - L_tx + G_rx - L_rx - path_loss`
pub fn compute_link_budget(
    path_loss_db: f64,
    method: PredictionMethod,
    config: &LinkConfig,
    params: &LinkAnalysisParams,
) -> LinkBudget {
    let eirp_dbm = config.tx_power_dbm + config.tx_antenna_gain_dbi - config.tx_cable_loss_db;
    let rssi_dbm =
        eirp_dbm + config.rx_antenna_gain_dbi - config.rx_cable_loss_db - path_loss_db;
    let sensitivity_dbm = config.rx_sensitivity_dbm.unwrap_or_else(|| {
        receiver_sensitivity(config.bandwidth_khz, config.spreading_factor, params)
    });

    LinkBudget {
        path_loss_db,
        method,
        eirp_dbm,
        rssi_dbm,
        sensitivity_dbm,
        margin_db: rssi_dbm - sensitivity_dbm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshrf_kernel::{KernelParameters, KernelResult, ViewshedJob, VisibilityMask};

    struct FixedLoss(Vec<f32>);

    impl Kernel for FixedLoss {
        fn compute_viewshed(&self, _job: &ViewshedJob) -> KernelResult<VisibilityMask> {
            unreachable!("not used by link budget tests")
        }

        fn compute_path_loss(
            &self,
            profile: &[f32],
            params: &KernelParameters,
        ) -> KernelResult<Vec<f32>> {
            assert_eq!(profile.len(), self.0.len());
            assert!(params.step_size_m > 0.0);
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_fspl_10km_915mhz() {
        assert_relative_eq!(free_space_path_loss(10_000.0, 915.0), 111.67, epsilon = 0.01);
    }

    #[test]
    fn test_sensitivity_sf7_125khz() {
        let params = LinkAnalysisParams::default();
        // -174 + 50.97 + 6 - 7.5
        assert_relative_eq!(receiver_sensitivity(125.0, 7, &params), -124.53, epsilon = 0.01);
    }

    #[test]
    fn test_budget_with_explicit_sensitivity() {
        let config = LinkConfig {
            tx_power_dbm: 20.0,
            tx_antenna_gain_dbi: 5.0,
            rx_antenna_gain_dbi: 5.0,
            tx_cable_loss_db: 1.0,
            rx_cable_loss_db: 0.5,
            rx_sensitivity_dbm: Some(-120.0),
            ..Default::default()
        };
        let budget = compute_link_budget(100.0, PredictionMethod::FreeSpace, &config, &LinkAnalysisParams::default());
        assert_relative_eq!(budget.eirp_dbm, 24.0);
        assert_relative_eq!(budget.rssi_dbm, -71.5);
        assert_relative_eq!(budget.margin_db, 48.5);
    }

    #[test]
    fn test_colocated_loss() {
        let params = LinkAnalysisParams::default();
        let (loss, method) =
            path_loss(0.5, &[], &LinkConfig::default(), &params, None).unwrap();
        assert_eq!(loss, 20.0);
        assert_eq!(method, PredictionMethod::Colocated);
    }

    #[test]
    fn test_terrain_model_requires_kernel() {
        let params = LinkAnalysisParams {
            propagation_model: PropagationModel::Terrain,
            ..Default::default()
        };
        assert!(matches!(
            path_loss(5_000.0, &[0.0; 10], &LinkConfig::default(), &params, None),
            Err(LinkAnalysisError::KernelRequired)
        ));
    }

    #[test]
    fn test_terrain_model_takes_last_sample() {
        let params = LinkAnalysisParams {
            propagation_model: PropagationModel::Terrain,
            ..Default::default()
        };
        let kernel = FixedLoss(vec![0.0, 90.0, 118.5]);
        let (loss, method) = path_loss(
            2_000.0,
            &[10.0, 20.0, 30.0],
            &LinkConfig::default(),
            &params,
            Some(&kernel as &dyn Kernel),
        )
        .unwrap();
        assert_relative_eq!(loss, 118.5);
        assert_eq!(method, PredictionMethod::Terrain);
    }

    #[test]
    fn test_terrain_failure_sentinel() {
        let params = LinkAnalysisParams {
            propagation_model: PropagationModel::Terrain,
            ..Default::default()
        };
        let kernel = FixedLoss(vec![0.0, FAILED_SAMPLE_LOSS_DB]);
        assert!(matches!(
            path_loss(2_000.0, &[1.0, 2.0], &LinkConfig::default(), &params, Some(&kernel as &dyn Kernel)),
            Err(LinkAnalysisError::PathLossUnavailable { .. })
        ));
    }
}
