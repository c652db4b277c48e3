//! Tunables for viewshed analysis.

use meshrf_tiles::DEFAULT_TILE_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the viewshed orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewshedConfig {
    // Tiles
    /// Edge length of one elevation tile in pixels.
    pub tile_size: u32,
    /// Zoom used for short analysis distances.
    pub fine_zoom: u8,
    /// Zoom used once the analysis distance exceeds `zoom_switch_distance_m`.
    pub coarse_zoom: u8,
    /// Distance above which the coarse zoom is used (meters).
    pub zoom_switch_distance_m: f64,

    // Progress reporting
    /// Percent published when fetching starts.
    pub progress_floor: u8,
    /// Percent reached once every tile has completed.
    pub fetch_ceiling: u8,
    /// Percent published while stitching and while the job is in flight.
    pub stitch_percent: u8,

    // Engine readiness
    /// How many times to re-check engine readiness before giving up.
    pub ready_retries: u32,
    /// Delay between readiness checks (milliseconds).
    pub ready_backoff_ms: u64,

    // Request defaults
    /// Observer height above ground when the caller gives none (meters).
    pub default_observer_height_m: f64,
    /// Analysis radius when the caller gives none (meters).
    pub default_max_distance_m: f64,
    /// Largest analysis radius accepted (meters).
    pub max_distance_m: f64,
}

impl Default for ViewshedConfig {
    fn default() -> Self {
        Self {
            // Tiles
            tile_size: DEFAULT_TILE_SIZE,
            fine_zoom: 12,
            coarse_zoom: 10,
            zoom_switch_distance_m: 8000.0,

            // Progress reporting
            progress_floor: 10,
            fetch_ceiling: 90,
            stitch_percent: 95,

            // Engine readiness
            ready_retries: 20,
            ready_backoff_ms: 200,

            // Request defaults
            default_observer_height_m: 2.0,
            default_max_distance_m: 25_000.0,
            max_distance_m: 100_000.0,
        }
    }
}

impl ViewshedConfig {
    /// Zoom level for an analysis radius.
    pub fn zoom_for(&self, max_distance_m: f64) -> u8 {
        if max_distance_m > self.zoom_switch_distance_m {
            self.coarse_zoom
        } else {
            self.fine_zoom
        }
    }

    /// Delay between readiness checks.
    pub fn ready_backoff(&self) -> Duration {
        Duration::from_millis(self.ready_backoff_ms)
    }

    /// Fetch-phase percent after `done` of `total` tiles have completed.
    pub fn fetch_percent(&self, done: usize, total: usize) -> u8 {
        if total == 0 {
            return self.fetch_ceiling;
        }
        let span = self.fetch_ceiling.saturating_sub(self.progress_floor) as usize;
        let done = done.min(total);
        self.progress_floor + (span * done / total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_switch() {
        let config = ViewshedConfig::default();
        assert_eq!(config.zoom_for(5_000.0), 12);
        assert_eq!(config.zoom_for(8_000.0), 12);
        assert_eq!(config.zoom_for(8_000.1), 10);
        assert_eq!(config.zoom_for(50_000.0), 10);
    }

    #[test]
    fn test_fetch_percent_spans_floor_to_ceiling() {
        let config = ViewshedConfig::default();
        assert_eq!(config.fetch_percent(0, 25), 10);
        assert_eq!(config.fetch_percent(25, 25), 90);
        assert_eq!(config.fetch_percent(30, 25), 90);
        assert_eq!(config.fetch_percent(0, 0), 90);

        let mut last = 0;
        for done in 0..=49 {
            let p = config.fetch_percent(done, 49);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: ViewshedConfig = serde_yaml::from_str("fine_zoom: 13\nready_retries: 5\n").unwrap();
        assert_eq!(config.fine_zoom, 13);
        assert_eq!(config.ready_retries, 5);
        assert_eq!(config.coarse_zoom, 10);
        assert_eq!(config.ready_backoff(), Duration::from_millis(200));
        assert_eq!(config.max_distance_m, 100_000.0);
    }
}
