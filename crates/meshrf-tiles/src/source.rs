//! Elevation tile sources.
//!
//! A [`TileSource`] hands back the encoded raster for a tile address. The
//! HTTP implementation expands a `{z}/{x}/{y}` URL template and keeps running
//! download counters; tests and offline tools plug in their own sources.

use crate::coord::TileAddress;
use crate::decode::{decode_terrain_rgb, ElevationTile};
use crate::{Result, TileError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Default tile URL template (Mapbox terrain-RGB).
pub const DEFAULT_TILE_URL: &str = "https://api.mapbox.com/v4/mapbox.terrain-rgb/{z}/{x}/{y}.pngraw";

/// Default edge length of a terrain-RGB tile, in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Source of encoded elevation tiles.
pub trait TileSource: Send + Sync {
    /// Fetch the encoded raster for a tile.
    fn fetch(&self, address: TileAddress) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Edge length every tile from this source must have, if known.
    fn tile_size(&self) -> Option<u32> {
        None
    }
}

impl<S: TileSource> TileSource for &S {
    fn fetch(&self, address: TileAddress) -> impl Future<Output = Result<Vec<u8>>> + Send {
        (**self).fetch(address)
    }

    fn tile_size(&self) -> Option<u32> {
        (**self).tile_size()
    }
}

impl<S: TileSource> TileSource for std::sync::Arc<S> {
    fn fetch(&self, address: TileAddress) -> impl Future<Output = Result<Vec<u8>>> + Send {
        (**self).fetch(address)
    }

    fn tile_size(&self) -> Option<u32> {
        (**self).tile_size()
    }
}

/// Configuration for [`HttpTileSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSourceConfig {
    /// URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    /// Access token appended as `access_token=` when set.
    pub access_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Tile edge length in pixels; tiles of any other size are rejected.
    pub tile_size: u32,
}

impl Default for TileSourceConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_TILE_URL.to_string(),
            access_token: None,
            timeout_secs: 30,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

/// Download statistics for a tile source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of tiles downloaded this session.
    pub tiles_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
    /// Number of failed requests this session.
    pub failures: usize,
}

/// Tile source backed by an HTTP tile server.
pub struct HttpTileSource {
    client: reqwest::Client,
    url_template: String,
    access_token: Option<String>,
    tile_size: u32,
    tiles_downloaded: AtomicUsize,
    bytes_downloaded: AtomicU64,
    failures: AtomicUsize,
}

impl std::fmt::Debug for HttpTileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTileSource")
            .field("url_template", &self.url_template)
            .field("tile_size", &self.tile_size)
            .finish()
    }
}

impl HttpTileSource {
    /// Create a source from configuration.
    pub fn new(config: &TileSourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("meshrf/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url_template: config.url_template.clone(),
            access_token: config.access_token.clone(),
            tile_size: config.tile_size,
            tiles_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
            failures: AtomicUsize::new(0),
        })
    }

    /// URL for a tile address.
    pub fn url_for(&self, address: TileAddress) -> String {
        let url = address.url(&self.url_template);
        match &self.access_token {
            Some(token) => {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{url}{sep}access_token={token}")
            }
            None => url,
        }
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            tiles_downloaded: self.tiles_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Reset download statistics.
    pub fn reset_download_stats(&self) {
        self.tiles_downloaded.store(0, Ordering::Relaxed);
        self.bytes_downloaded.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }

    async fn download(&self, address: TileAddress) -> Result<Vec<u8>> {
        let url = self.url_for(address);
        debug!(tile = %address, "Fetching elevation tile");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(TileError::TileDownloadFailed {
                address,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await?;
        self.tiles_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);

        Ok(bytes.to_vec())
    }
}

impl TileSource for HttpTileSource {
    async fn fetch(&self, address: TileAddress) -> Result<Vec<u8>> {
        let result = self.download(address).await;
        if result.is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn tile_size(&self) -> Option<u32> {
        Some(self.tile_size)
    }
}

/// Fetch and decode one tile.
///
/// Any failure (transport, HTTP status, decode or a tile whose size differs
/// from [`TileSource::tile_size`]) is logged and reported as `None` so that a
/// block fetch can carry on with the tiles that did arrive.
pub async fn fetch_elevation_tile<S: TileSource>(
    source: &S,
    address: TileAddress,
) -> Option<ElevationTile> {
    let encoded = match source.fetch(address).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(tile = %address, error = %e, "Tile fetch failed");
            return None;
        }
    };

    let tile = match decode_terrain_rgb(&encoded, address) {
        Ok(tile) => tile,
        Err(e) => {
            warn!(tile = %address, error = %e, "Tile decode failed");
            return None;
        }
    };

    match source.tile_size() {
        Some(size) if tile.width() != size || tile.height() != size => {
            warn!(
                tile = %address,
                width = tile.width(),
                height = tile.height(),
                expected = size,
                "Tile has unexpected size"
            );
            None
        }
        _ => Some(tile),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::encode_terrain_rgb;

    struct FixedSource {
        png: Vec<u8>,
        tile_size: Option<u32>,
    }

    impl TileSource for FixedSource {
        async fn fetch(&self, address: TileAddress) -> Result<Vec<u8>> {
            if address.x == 0 {
                return Err(TileError::TileDownloadFailed {
                    address,
                    reason: "HTTP 404 Not Found".to_string(),
                });
            }
            Ok(self.png.clone())
        }

        fn tile_size(&self) -> Option<u32> {
            self.tile_size
        }
    }

    fn addr(x: u32) -> TileAddress {
        TileAddress { x, y: 1, zoom: 2 }
    }

    #[test]
    fn test_url_with_token() {
        let config = TileSourceConfig {
            url_template: "https://tiles.example/{z}/{x}/{y}.png".to_string(),
            access_token: Some("abc".to_string()),
            ..Default::default()
        };
        let source = HttpTileSource::new(&config).unwrap();
        assert_eq!(
            source.url_for(addr(3)),
            "https://tiles.example/2/3/1.png?access_token=abc"
        );
        assert_eq!(source.download_stats(), DownloadStats::default());
    }

    #[tokio::test]
    async fn test_fetch_elevation_tile_decodes() {
        let tile = ElevationTile::filled(addr(1), 4, 123.4);
        let source = FixedSource {
            png: encode_terrain_rgb(&tile).unwrap(),
            tile_size: Some(4),
        };
        let fetched = fetch_elevation_tile(&source, addr(1)).await.unwrap();
        assert_eq!(fetched.width(), 4);
        assert!((fetched.data()[0] - 123.4).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_fetch_elevation_tile_failures_are_none() {
        let source = FixedSource {
            png: b"garbage".to_vec(),
            tile_size: None,
        };
        assert!(fetch_elevation_tile(&source, addr(0)).await.is_none());
        assert!(fetch_elevation_tile(&source, addr(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_elevation_tile_rejects_wrong_size() {
        let tile = ElevationTile::filled(addr(1), 2, 50.0);
        let source = FixedSource {
            png: encode_terrain_rgb(&tile).unwrap(),
            tile_size: Some(4),
        };
        assert!(fetch_elevation_tile(&source, addr(1)).await.is_none());
        assert!(fetch_elevation_tile(&&source, addr(1)).await.is_none());
    }

    #[test]
    fn test_http_source_reports_configured_tile_size() {
        let config = TileSourceConfig {
            tile_size: 512,
            ..Default::default()
        };
        let source = HttpTileSource::new(&config).unwrap();
        assert_eq!(source.tile_size(), Some(512));
    }
}
