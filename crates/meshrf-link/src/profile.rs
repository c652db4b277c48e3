//! Line-of-sight geometry along a terrain profile.

use crate::{LinkAnalysisError, LinkAnalysisParams, LinkConfig, Result};
use meshrf_tiles::ProfilePoint;

/// One terrain sample as input to the analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSample {
    /// Distance from the transmitter (meters).
    pub distance_m: f64,
    /// Terrain elevation (meters).
    pub elevation_m: f64,
}

impl TerrainSample {
    pub fn new(distance_m: f64, elevation_m: f64) -> Self {
        Self {
            distance_m,
            elevation_m,
        }
    }
}

impl From<ProfilePoint> for TerrainSample {
    fn from(p: ProfilePoint) -> Self {
        Self::new(p.distance_m, p.elevation_m as f64)
    }
}

/// Geometry at one point of the path.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkProfileSample {
    /// Distance from the transmitter (meters).
    pub distance_m: f64,
    /// Terrain elevation (meters).
    pub terrain_elevation_m: f64,
    /// Height of the direct ray (meters).
    pub line_of_sight_height_m: f64,
    /// First Fresnel zone radius (meters).
    pub fresnel_r1_m: f64,
    /// Earth bulge correction at this point (meters).
    pub earth_bulge_m: f64,
    /// Distance from the bottom of the Fresnel zone down to terrain plus
    /// clutter; negative when terrain intrudes (meters).
    pub clearance_m: f64,
}

impl LinkProfileSample {
    /// Whether terrain intrudes into the first Fresnel zone here.
    pub fn is_obstructing(&self) -> bool {
        self.clearance_m < 0.0
    }
}

/// Information about the terrain along the path.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerrainInfo {
    /// Number of elevation samples.
    pub sample_count: usize,
    /// Mean spacing between samples (meters).
    pub resolution_m: f64,
    /// Minimum elevation along path (meters).
    pub min_elevation: f64,
    /// Maximum elevation along path (meters).
    pub max_elevation: f64,
    /// Mean elevation along path (meters).
    pub mean_elevation: f64,
    /// Terrain irregularity, max minus min (meters).
    pub delta_h: f64,
}

/// Result of analyzing a terrain profile.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileAnalysis {
    pub samples: Vec<LinkProfileSample>,
    /// Path length (meters).
    pub distance_m: f64,
    /// Whether any sample intrudes into the first Fresnel zone.
    pub is_obstructed: bool,
    /// Smallest clearance over all samples (meters).
    pub min_clearance_m: f64,
    pub terrain: TerrainInfo,
}

/// First Fresnel zone radius in meters at distance `d1_m` along a path of
/// `total_m` meters. Zero at both endpoints.
pub fn fresnel_radius(d1_m: f64, total_m: f64, frequency_mhz: f64) -> f64 {
    let d2_m = (total_m - d1_m).max(0.0);
    if d1_m <= 0.0 || d2_m <= 0.0 || total_m <= 0.0 {
        return 0.0;
    }
    17.3 * ((d1_m / 1000.0) * (d2_m / 1000.0) / (frequency_mhz * total_m / 1000.0)).sqrt()
}

/// Earth bulge in meters at distance `d1_m` along a path of `total_m`
/// meters, for an effective earth radius in meters.
pub fn earth_bulge(d1_m: f64, total_m: f64, effective_radius_m: f64) -> f64 {
    let d2_m = (total_m - d1_m).max(0.0);
    d1_m.max(0.0) * d2_m / (2.0 * effective_radius_m)
}

/// Turn an elevation profile into line-of-sight and Fresnel geometry.
///
/// The ray runs from `terrain[0] + tx height` to `terrain[last] + rx height`.
/// A sample obstructs when terrain, lowered by the earth bulge and raised by
/// clutter, rises above the bottom of the first Fresnel zone.
pub fn analyze_profile(
    profile: &[TerrainSample],
    config: &LinkConfig,
    params: &LinkAnalysisParams,
) -> Result<ProfileAnalysis> {
    let (first, last) = match profile {
        [first, .., last] => (first, last),
        _ => {
            return Err(LinkAnalysisError::InvalidProfile(format!(
                "need at least 2 samples, got {}",
                profile.len()
            )))
        }
    };
    if profile.windows(2).any(|w| w[1].distance_m < w[0].distance_m) {
        return Err(LinkAnalysisError::InvalidProfile(
            "sample distances must be non-decreasing".to_string(),
        ));
    }
    if !(config.frequency_mhz > 0.0) {
        return Err(LinkAnalysisError::InvalidParameter(format!(
            "frequency must be positive, got {} MHz",
            config.frequency_mhz
        )));
    }
    if !(params.k_factor > 0.0) || !(params.earth_radius_km > 0.0) {
        return Err(LinkAnalysisError::InvalidParameter(
            "k-factor and earth radius must be positive".to_string(),
        ));
    }

    let total = last.distance_m - first.distance_m;
    let h1 = first.elevation_m + config.tx_antenna_height_m;
    let h2 = last.elevation_m + config.rx_antenna_height_m;
    let effective_radius = params.effective_earth_radius_m();

    let samples: Vec<LinkProfileSample> = profile
        .iter()
        .map(|s| {
            let d = s.distance_m - first.distance_m;
            let los = if total > 0.0 {
                h1 + (h2 - h1) * d / total
            } else {
                h1
            };
            let fresnel = fresnel_radius(d, total, config.frequency_mhz);
            let bulge = earth_bulge(d, total, effective_radius);
            let obstacle = s.elevation_m - bulge + params.clutter_height_m;
            LinkProfileSample {
                distance_m: s.distance_m,
                terrain_elevation_m: s.elevation_m,
                line_of_sight_height_m: los,
                fresnel_r1_m: fresnel,
                earth_bulge_m: bulge,
                clearance_m: (los - fresnel) - obstacle,
            }
        })
        .collect();

    let is_obstructed = samples.iter().any(LinkProfileSample::is_obstructing);
    let min_clearance_m = samples
        .iter()
        .map(|s| s.clearance_m)
        .fold(f64::INFINITY, f64::min);

    Ok(ProfileAnalysis {
        terrain: terrain_info(profile, total),
        samples,
        distance_m: total,
        is_obstructed,
        min_clearance_m,
    })
}

fn terrain_info(profile: &[TerrainSample], total: f64) -> TerrainInfo {
    let min = profile
        .iter()
        .map(|s| s.elevation_m)
        .fold(f64::INFINITY, f64::min);
    let max = profile
        .iter()
        .map(|s| s.elevation_m)
        .fold(f64::NEG_INFINITY, f64::max);
    let mean = profile.iter().map(|s| s.elevation_m).sum::<f64>() / profile.len() as f64;

    TerrainInfo {
        sample_count: profile.len(),
        resolution_m: total / (profile.len() - 1) as f64,
        min_elevation: min,
        max_elevation: max,
        mean_elevation: mean,
        delta_h: max - min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(distance_m: f64, n: usize, elevation: f64) -> Vec<TerrainSample> {
        (0..n)
            .map(|i| TerrainSample::new(distance_m * i as f64 / (n - 1) as f64, elevation))
            .collect()
    }

    fn config_915(height: f64) -> LinkConfig {
        LinkConfig {
            frequency_mhz: 915.0,
            tx_antenna_height_m: height,
            rx_antenna_height_m: height,
            ..Default::default()
        }
    }

    #[test]
    fn test_fresnel_zero_at_endpoints() {
        assert_eq!(fresnel_radius(0.0, 10_000.0, 915.0), 0.0);
        assert_eq!(fresnel_radius(10_000.0, 10_000.0, 915.0), 0.0);
        assert_eq!(fresnel_radius(10_000.000_001, 10_000.0, 915.0), 0.0);
    }

    #[test]
    fn test_fresnel_midpoint() {
        // 17.3 * sqrt(5 * 5 / (915 * 10))
        assert_relative_eq!(fresnel_radius(5_000.0, 10_000.0, 915.0), 0.9043, epsilon = 1e-3);
        assert!(fresnel_radius(5_000.0, 10_000.0, 915.0) > fresnel_radius(2_000.0, 10_000.0, 915.0));
    }

    #[test]
    fn test_earth_bulge_midpoint() {
        let bulge = earth_bulge(5_000.0, 10_000.0, 1.33 * 6_371_000.0);
        assert_relative_eq!(bulge, 1.4752, epsilon = 1e-3);
        assert_eq!(earth_bulge(0.0, 10_000.0, 8_473_430.0), 0.0);
    }

    #[test]
    fn test_flat_profile_is_clear() {
        let profile = flat(10_000.0, 101, 100.0);
        let analysis =
            analyze_profile(&profile, &config_915(10.0), &LinkAnalysisParams::default()).unwrap();

        assert!(!analysis.is_obstructed);
        assert!(analysis.min_clearance_m > 0.0);
        assert_eq!(analysis.samples.len(), 101);
        assert_eq!(analysis.samples[0].fresnel_r1_m, 0.0);
        assert_eq!(analysis.samples[100].fresnel_r1_m, 0.0);
        assert_relative_eq!(analysis.samples[50].line_of_sight_height_m, 110.0);
        assert_relative_eq!(analysis.distance_m, 10_000.0);
        assert_eq!(analysis.terrain.delta_h, 0.0);
        assert_relative_eq!(analysis.terrain.resolution_m, 100.0);
    }

    #[test]
    fn test_ridge_obstructs() {
        let mut profile = flat(10_000.0, 101, 100.0);
        profile[50].elevation_m = 112.0;
        let analysis =
            analyze_profile(&profile, &config_915(10.0), &LinkAnalysisParams::default()).unwrap();

        assert!(analysis.is_obstructed);
        assert!(analysis.samples[50].is_obstructing());
        assert!(analysis.min_clearance_m < 0.0);
        assert_eq!(analysis.terrain.max_elevation, 112.0);
    }

    #[test]
    fn test_clutter_raises_obstacles() {
        let profile = flat(10_000.0, 11, 100.0);
        let params = LinkAnalysisParams {
            clutter_height_m: 15.0,
            ..Default::default()
        };
        let analysis = analyze_profile(&profile, &config_915(10.0), &params).unwrap();
        assert!(analysis.is_obstructed);
    }

    #[test]
    fn test_sloped_line_of_sight() {
        let profile = vec![
            TerrainSample::new(0.0, 0.0),
            TerrainSample::new(500.0, 0.0),
            TerrainSample::new(1_000.0, 100.0),
        ];
        let analysis =
            analyze_profile(&profile, &config_915(10.0), &LinkAnalysisParams::default()).unwrap();
        assert_relative_eq!(analysis.samples[1].line_of_sight_height_m, 60.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let params = LinkAnalysisParams::default();
        let config = config_915(10.0);
        assert!(matches!(
            analyze_profile(&[TerrainSample::new(0.0, 0.0)], &config, &params),
            Err(LinkAnalysisError::InvalidProfile(_))
        ));

        let backwards = vec![TerrainSample::new(10.0, 0.0), TerrainSample::new(0.0, 0.0)];
        assert!(matches!(
            analyze_profile(&backwards, &config, &params),
            Err(LinkAnalysisError::InvalidProfile(_))
        ));

        let zero_freq = LinkConfig {
            frequency_mhz: 0.0,
            ..config
        };
        assert!(matches!(
            analyze_profile(&flat(100.0, 3, 0.0), &zero_freq, &params),
            Err(LinkAnalysisError::InvalidParameter(_))
        ));
    }
}
