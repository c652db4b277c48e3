//! Link analysis parameters and quality classification.

use meshrf_kernel::KernelParameters;

/// Path loss model used for the link budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PropagationModel {
    /// Free-space path loss; terrain only affects the obstruction verdict.
    #[default]
    FreeSpace,
    /// Terrain-aware path loss from the numeric engine.
    Terrain,
}

impl std::fmt::Display for PropagationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropagationModel::FreeSpace => write!(f, "Free-Space"),
            PropagationModel::Terrain => write!(f, "Terrain"),
        }
    }
}

/// Link quality verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkQuality {
    /// Margin of at least 10 dB.
    Excellent,
    /// Margin of at least 5 dB.
    Good,
    /// Margin of at least 0 dB.
    Fair,
    /// Margin of at least -10 dB.
    Marginal,
    /// Margin below -10 dB.
    NoSignal,
    /// Terrain intrudes into the first Fresnel zone.
    Obstructed,
}

impl LinkQuality {
    /// Returns a human-readable description of the verdict.
    pub fn description(&self) -> &'static str {
        match self {
            LinkQuality::Excellent => "Excellent (≥10 dB margin)",
            LinkQuality::Good => "Good (≥5 dB margin)",
            LinkQuality::Fair => "Fair (0-5 dB margin)",
            LinkQuality::Marginal => "Marginal (-10-0 dB margin)",
            LinkQuality::NoSignal => "NO SIGNAL (below -10 dB margin)",
            LinkQuality::Obstructed => "OBSTRUCTED (Fresnel zone blocked)",
        }
    }

    /// Whether the link is expected to carry traffic.
    pub fn is_usable(&self) -> bool {
        matches!(self, LinkQuality::Excellent | LinkQuality::Good | LinkQuality::Fair)
    }
}

impl std::fmt::Display for LinkQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Configurable parameters for link analysis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkAnalysisParams {
    // Path geometry
    /// Effective earth radius multiplier for refraction.
    pub k_factor: f64,
    /// Height of ground clutter (trees, buildings) added to terrain (meters).
    pub clutter_height_m: f64,
    /// Mean earth radius (kilometers).
    pub earth_radius_km: f64,

    // Link quality classification
    /// Minimum margin for excellent link quality (dB).
    pub margin_excellent_db: f64,
    /// Minimum margin for good link quality (dB).
    pub margin_good_db: f64,
    /// Minimum margin for fair link quality (dB).
    pub margin_fair_db: f64,
    /// Minimum margin for marginal link quality (dB).
    pub margin_marginal_db: f64,

    // Receiver
    /// Receiver noise figure (dB).
    pub noise_figure_db: f64,
    /// Demodulation SNR floors for SF7-SF12 (indexed 0-5).
    pub snr_thresholds: [f64; 6],

    // Path loss
    /// Path loss model.
    pub propagation_model: PropagationModel,
    /// Below this distance the endpoints are treated as co-located (meters).
    pub fspl_min_distance_m: f64,
    /// Fixed near-field path loss for co-located endpoints (dB).
    pub colocated_path_loss_db: f64,
    /// Ground and climate settings for the terrain model.
    pub kernel: KernelParameters,
}

impl Default for LinkAnalysisParams {
    fn default() -> Self {
        Self {
            // Path geometry
            k_factor: 1.33,
            clutter_height_m: 0.0,
            earth_radius_km: 6371.0,

            // Link quality classification
            margin_excellent_db: 10.0,
            margin_good_db: 5.0,
            margin_fair_db: 0.0,
            margin_marginal_db: -10.0,

            // Receiver
            noise_figure_db: 6.0,
            snr_thresholds: [-7.5, -10.0, -12.5, -15.0, -17.5, -20.0],

            // Path loss
            propagation_model: PropagationModel::FreeSpace,
            fspl_min_distance_m: 1.0,
            colocated_path_loss_db: 20.0,
            kernel: KernelParameters::default(),
        }
    }
}

impl LinkAnalysisParams {
    /// Get the SNR floor for a given spreading factor.
    ///
    /// Returns the SF7 floor for unknown spreading factors.
    pub fn snr_threshold_for_sf(&self, spreading_factor: u8) -> f64 {
        match spreading_factor {
            7..=12 => self.snr_thresholds[(spreading_factor - 7) as usize],
            _ => self.snr_thresholds[0],
        }
    }

    /// Classify link quality based on margin alone.
    pub fn classify_margin(&self, margin_db: f64) -> LinkQuality {
        if margin_db >= self.margin_excellent_db {
            LinkQuality::Excellent
        } else if margin_db >= self.margin_good_db {
            LinkQuality::Good
        } else if margin_db >= self.margin_fair_db {
            LinkQuality::Fair
        } else if margin_db >= self.margin_marginal_db {
            LinkQuality::Marginal
        } else {
            LinkQuality::NoSignal
        }
    }

    /// Classify a link, letting obstruction override the margin verdict unless
    /// free-space propagation is in effect.
    pub fn classify_link(&self, margin_db: f64, is_obstructed: bool) -> LinkQuality {
        if is_obstructed && self.propagation_model != PropagationModel::FreeSpace {
            return LinkQuality::Obstructed;
        }
        self.classify_margin(margin_db)
    }

    /// Effective earth radius in meters.
    pub fn effective_earth_radius_m(&self) -> f64 {
        self.k_factor * self.earth_radius_km * 1000.0
    }
}
