//! Terrain profiles sampled along a straight path.

use crate::coord::{
    fractional_tile, longitude_delta, tiles_per_axis, wrap_longitude, GeoPoint, TileAddress,
};
use crate::decode::ElevationTile;
use crate::source::{fetch_elevation_tile, TileSource};
use crate::{Result, TileError};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Mean earth radius used for great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// One terrain sample along a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    /// Distance from the start of the path, in meters.
    pub distance_m: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Terrain elevation in meters.
    pub elevation_m: f32,
}

/// Calculate the distance between two points using the haversine formula.
///
/// Returns the distance in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Sample `samples` evenly spaced elevations between two points.
///
/// Points are interpolated linearly in latitude/longitude, which is accurate
/// enough for radio-link distances. Longitude runs the short way round, so a
/// path across the antimeridian stays on its own side of the planet. Every tile the path crosses is fetched
/// once, concurrently; a sample whose tile could not be loaded fails the whole
/// profile with [`TileError::NoData`].
pub async fn sample_profile<S: TileSource>(
    source: &S,
    from: GeoPoint,
    to: GeoPoint,
    samples: usize,
    zoom: u8,
) -> Result<Vec<ProfilePoint>> {
    if samples < 2 {
        return Err(TileError::InvalidProfile(format!(
            "need at least 2 samples, got {}",
            samples
        )));
    }

    let total_distance = haversine_distance(from.lat, from.lon, to.lat, to.lon);
    let delta_lon = longitude_delta(from.lon, to.lon);

    let mut positions = Vec::with_capacity(samples);
    for i in 0..samples {
        let t = i as f64 / (samples - 1) as f64;
        let lat = from.lat + t * (to.lat - from.lat);
        let lon = wrap_longitude(from.lon + t * delta_lon);
        let address = TileAddress::from_lat_lon(lat, lon, zoom)?;
        positions.push((t * total_distance, lat, lon, address));
    }

    let unique: HashSet<TileAddress> = positions.iter().map(|p| p.3).collect();
    debug!(
        tiles = unique.len(),
        samples,
        distance_m = total_distance,
        "Sampling terrain profile"
    );

    let fetched = join_all(unique.into_iter().map(|address| async move {
        (address, fetch_elevation_tile(source, address).await)
    }))
    .await;
    let tiles: HashMap<TileAddress, ElevationTile> = fetched
        .into_iter()
        .filter_map(|(address, tile)| tile.map(|t| (address, t)))
        .collect();

    let n = tiles_per_axis(zoom) as f64;
    positions
        .into_iter()
        .map(|(distance_m, lat, lon, address)| {
            let tile = tiles.get(&address).ok_or(TileError::NoData { lat, lon })?;
            let (fx, fy) = fractional_tile(lat, lon, zoom);
            let u = fx.rem_euclid(n) - address.x as f64;
            let v = fy - address.y as f64;
            Ok(ProfilePoint {
                distance_m,
                lat,
                lon,
                elevation_m: tile.sample(u, v),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::encode_terrain_rgb;
    use approx::assert_relative_eq;

    struct SlopeSource;

    impl TileSource for SlopeSource {
        async fn fetch(&self, address: TileAddress) -> Result<Vec<u8>> {
            // Each tile is flat at 10 m per column index.
            let tile = ElevationTile::filled(address, 8, address.x as f32 * 10.0);
            encode_terrain_rgb(&tile)
        }
    }

    /// Records every tile it is asked for.
    #[derive(Default)]
    struct RecordingSource {
        requested: std::sync::Mutex<Vec<TileAddress>>,
    }

    impl TileSource for RecordingSource {
        async fn fetch(&self, address: TileAddress) -> Result<Vec<u8>> {
            self.requested.lock().unwrap().push(address);
            SlopeSource.fetch(address).await
        }
    }

    struct EmptySource;

    impl TileSource for EmptySource {
        async fn fetch(&self, address: TileAddress) -> Result<Vec<u8>> {
            Err(TileError::TileDownloadFailed {
                address,
                reason: "offline".to_string(),
            })
        }
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert_relative_eq!(d, 111_195.0, epsilon = 1.0);
    }

    #[tokio::test]
    async fn test_profile_endpoints_and_spacing() {
        let from = GeoPoint::new(47.60, -122.40);
        let to = GeoPoint::new(47.60, -122.30);
        let profile = sample_profile(&SlopeSource, from, to, 11, 12).await.unwrap();

        assert_eq!(profile.len(), 11);
        assert_eq!(profile[0].distance_m, 0.0);
        let total = haversine_distance(from.lat, from.lon, to.lat, to.lon);
        assert_relative_eq!(profile[10].distance_m, total, epsilon = 1e-6);

        let first_tile = TileAddress::from_lat_lon(from.lat, from.lon, 12).unwrap();
        assert!((profile[0].elevation_m - first_tile.x as f32 * 10.0).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_profile_across_antimeridian_takes_short_way() {
        let source = RecordingSource::default();
        let from = GeoPoint::new(0.0, 179.99);
        let to = GeoPoint::new(0.0, -179.99);
        let profile = sample_profile(&source, from, to, 11, 12).await.unwrap();

        assert_relative_eq!(profile[10].distance_m, 2_223.9, epsilon = 1.0);
        for p in &profile {
            assert!(p.lon.abs() >= 179.98, "sample at lon {} left the path", p.lon);
            assert!((-180.0..180.0).contains(&p.lon));
        }

        // Only the last column east of 180°W and the first one west of it.
        let last_column = tiles_per_axis(12) as u32 - 1;
        let requested = source.requested.lock().unwrap();
        assert_eq!(requested.len(), 2);
        assert!(requested.iter().all(|a| a.x == 0 || a.x == last_column));
        for p in &profile {
            let expected = if p.lon < 0.0 { 0.0 } else { last_column as f32 * 10.0 };
            assert!((p.elevation_m - expected).abs() < 0.05);
        }
    }

    #[tokio::test]
    async fn test_profile_requires_two_samples() {
        let p = GeoPoint::new(0.0, 0.0);
        assert!(matches!(
            sample_profile(&SlopeSource, p, p, 1, 10).await,
            Err(TileError::InvalidProfile(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_tiles_are_no_data() {
        let from = GeoPoint::new(10.0, 10.0);
        let to = GeoPoint::new(10.01, 10.01);
        assert!(matches!(
            sample_profile(&EmptySource, from, to, 5, 12).await,
            Err(TileError::NoData { .. })
        ));
    }
}
