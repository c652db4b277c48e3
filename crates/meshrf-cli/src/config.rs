//! YAML configuration for the `meshrf` binary.

use anyhow::{bail, Context, Result};
use meshrf_link::{LinkAnalysisParams, LinkConfig};
use meshrf_tiles::TileSourceConfig;
use meshrf_viewshed::ViewshedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no tile access token is configured.
pub const TOKEN_ENV: &str = "MESHRF_TILE_TOKEN";

/// Numeric engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the engine shared library; the platform default name is
    /// searched for when unset.
    pub library: Option<PathBuf>,
}

/// Everything the binary can be configured with. Missing sections take
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tiles: TileSourceConfig,
    pub viewshed: ViewshedConfig,
    pub link: LinkConfig,
    pub analysis: LinkAnalysisParams,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Parse YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill the access token from the environment if the file has none.
    pub fn with_env_token(mut self) -> Self {
        if self.tiles.access_token.is_none() {
            self.tiles.access_token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.tiles.tile_size == 0 {
            bail!("tiles.tile_size must be positive");
        }
        if self.tiles.tile_size != self.viewshed.tile_size {
            bail!(
                "tiles.tile_size ({}) and viewshed.tile_size ({}) differ",
                self.tiles.tile_size,
                self.viewshed.tile_size
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshrf_kernel::Climate;
    use meshrf_link::PropagationModel;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let yaml = r#"
tiles:
  url_template: "http://localhost:8080/{z}/{x}/{y}.png"
viewshed:
  coarse_zoom: 9
link:
  frequency_mhz: 915.0
  rx_sensitivity_dbm: -125.0
analysis:
  propagation_model: terrain
  clutter_height_m: 8.0
  kernel:
    climate: maritime_temperate_over_land
engine:
  library: /opt/meshrf/libmeshrf.so
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.tiles.url_template, "http://localhost:8080/{z}/{x}/{y}.png");
        assert_eq!(config.tiles.timeout_secs, 30);
        assert_eq!(config.viewshed.coarse_zoom, 9);
        assert_eq!(config.viewshed.fine_zoom, 12);
        assert_eq!(config.link.frequency_mhz, 915.0);
        assert_eq!(config.link.rx_sensitivity_dbm, Some(-125.0));
        assert_eq!(config.link.spreading_factor, 7);
        assert_eq!(config.analysis.propagation_model, PropagationModel::Terrain);
        assert_eq!(config.analysis.clutter_height_m, 8.0);
        assert_eq!(config.analysis.k_factor, 1.33);
        assert_eq!(config.analysis.kernel.climate, Climate::MaritimeTemperateOverLand);
        assert_eq!(
            config.engine.library.as_deref(),
            Some(Path::new("/opt/meshrf/libmeshrf.so"))
        );
    }

    #[test]
    fn test_mismatched_tile_size_is_rejected() {
        let yaml = "tiles:\n  tile_size: 512\n";
        assert!(AppConfig::from_yaml(yaml).is_err());

        let yaml = "tiles:\n  tile_size: 512\nviewshed:\n  tile_size: 512\n";
        assert!(AppConfig::from_yaml(yaml).is_ok());
    }
}
