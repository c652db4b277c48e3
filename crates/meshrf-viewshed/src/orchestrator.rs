//! Viewshed analysis from a geographic request to a visibility layer.
//!
//! One call to [`ViewshedOrchestrator::run`] walks a request through
//! `Fetching → Stitching → Dispatched → Fulfilled`. Starting another request
//! supersedes the one in flight: it is not dispatched if it has not been yet,
//! and its result is dropped if it has.

use crate::engine::{spawn_engine, EngineHandle, EngineReport};
use crate::jobs::{JobId, JobMetadata, JobTable};
use crate::{Result, ViewshedConfig, ViewshedError};
use futures::stream::{FuturesUnordered, StreamExt};
use meshrf_kernel::{Kernel, KernelResult, ViewshedJob, VisibilityMask};
use meshrf_tiles::{
    fetch_elevation_tile, ground_sample_distance, required_tile_radius, stitch_tiles, GeoPoint,
    ObserverProjection, TileAddress, TileBounds, TileSource,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// A single-point visibility request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewshedRequest {
    pub observer: GeoPoint,
    /// Observer height above ground (meters).
    pub observer_height_m: f64,
    /// Analysis radius (meters).
    pub max_distance_m: f64,
}

impl ViewshedRequest {
    pub fn new(observer: GeoPoint, observer_height_m: f64, max_distance_m: f64) -> Self {
        Self {
            observer,
            observer_height_m,
            max_distance_m,
        }
    }

    fn validate(&self) -> Result<()> {
        let GeoPoint { lat, lon, .. } = self.observer;
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ViewshedError::InvalidRequest(format!("latitude {} out of range", lat)));
        }
        if !lon.is_finite() {
            return Err(ViewshedError::InvalidRequest(format!("longitude {} is not finite", lon)));
        }
        if !(self.max_distance_m > 0.0) || !self.max_distance_m.is_finite() {
            return Err(ViewshedError::InvalidRequest(format!(
                "max distance must be positive, got {} m",
                self.max_distance_m
            )));
        }
        if !self.observer_height_m.is_finite() {
            return Err(ViewshedError::InvalidRequest(
                "observer height is not finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Stage of the most recent analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Fetching,
    Stitching,
    Dispatched,
    Fulfilled,
    Stale,
    Failed,
}

/// Progress of the most recent analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnalysisProgress {
    pub job_id: Option<JobId>,
    pub status: AnalysisStatus,
    pub percent: u8,
}

/// Visibility result with the geographic context needed to place it.
#[derive(Debug, Clone)]
pub struct ViewshedLayer {
    pub job_id: JobId,
    pub mask: VisibilityMask,
    pub width: usize,
    pub height: usize,
    pub bounds: TileBounds,
    pub center: TileAddress,
    /// Observer position in mask pixels.
    pub observer: ObserverProjection,
    /// Meters per pixel at the observer's latitude.
    pub gsd_m: f64,
    /// Analysis radius in pixels.
    pub radius_px: i32,
}

impl ViewshedLayer {
    fn new(job_id: JobId, metadata: JobMetadata, mask: VisibilityMask) -> Self {
        Self {
            job_id,
            mask,
            width: metadata.width,
            height: metadata.height,
            bounds: metadata.bounds,
            center: metadata.center,
            observer: metadata.observer,
            gsd_m: metadata.gsd_m,
            radius_px: metadata.radius_px,
        }
    }

    pub fn visible_count(&self) -> usize {
        self.mask.visible_count()
    }

    /// Approximate visible ground area in km², using the observer's GSD.
    pub fn visible_area_km2(&self) -> f64 {
        self.visible_count() as f64 * self.gsd_m * self.gsd_m / 1_000_000.0
    }
}

/// How an analysis ended.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Completed(ViewshedLayer),
    /// A newer request replaced this one.
    Superseded,
}

/// Drives viewshed requests through tile retrieval, stitching and the engine.
///
/// Must be created inside a tokio runtime; a task routing engine reports to
/// waiting requests is spawned on construction.
pub struct ViewshedOrchestrator<S> {
    source: S,
    engine: EngineHandle,
    jobs: Arc<JobTable>,
    config: ViewshedConfig,
    progress: watch::Sender<AnalysisProgress>,
}

impl<S: TileSource> ViewshedOrchestrator<S> {
    /// Wrap a running engine.
    pub fn new(
        source: S,
        engine: EngineHandle,
        reports: mpsc::UnboundedReceiver<EngineReport>,
        config: ViewshedConfig,
    ) -> Self {
        let jobs = Arc::new(JobTable::new());
        tokio::spawn(route_reports(reports, Arc::clone(&jobs)));
        let (progress, _) = watch::channel(AnalysisProgress::default());

        Self {
            source,
            engine,
            jobs,
            config,
            progress,
        }
    }

    /// Start an engine around `factory` and wrap it.
    pub fn start<F>(source: S, factory: F, config: ViewshedConfig) -> Result<Self>
    where
        F: FnOnce() -> KernelResult<Box<dyn Kernel>> + Send + 'static,
    {
        let (engine, reports) = spawn_engine(factory)?;
        Ok(Self::new(source, engine, reports, config))
    }

    pub fn config(&self) -> &ViewshedConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Latest progress.
    pub fn progress(&self) -> AnalysisProgress {
        *self.progress.borrow()
    }

    /// Follow progress updates.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisProgress> {
        self.progress.subscribe()
    }

    /// Stop the engine thread and wait for it to exit.
    ///
    /// Requests still waiting on a result fail with
    /// [`ViewshedError::EngineUnavailable`].
    pub fn shutdown(self) {
        self.engine.shutdown();
    }

    /// Run one analysis to completion.
    ///
    /// Returns [`AnalysisOutcome::Superseded`] if another call to `run`
    /// started before this one finished.
    pub async fn run(&self, request: ViewshedRequest) -> Result<AnalysisOutcome> {
        request.validate()?;
        if request.max_distance_m > self.config.max_distance_m {
            return Err(ViewshedError::InvalidRequest(format!(
                "max distance {} m exceeds the {} m limit",
                request.max_distance_m, self.config.max_distance_m
            )));
        }

        let (job_id, result_rx) = self.jobs.begin();
        info!(
            %job_id,
            observer = %request.observer,
            max_distance_m = request.max_distance_m,
            "Starting viewshed analysis"
        );

        match self.prepare_and_dispatch(job_id, &request).await {
            Ok(true) => {}
            Ok(false) => {
                info!(%job_id, "Superseded before dispatch");
                self.finish(job_id, AnalysisStatus::Stale);
                return Ok(AnalysisOutcome::Superseded);
            }
            Err(e) => {
                warn!(%job_id, error = %e, "Viewshed analysis failed");
                self.jobs.cancel(job_id);
                self.finish(job_id, AnalysisStatus::Failed);
                return Err(e);
            }
        }

        match result_rx.await {
            Ok(Ok(completed)) => {
                self.finish(job_id, AnalysisStatus::Fulfilled);
                Ok(AnalysisOutcome::Completed(ViewshedLayer::new(
                    job_id,
                    completed.metadata,
                    completed.mask,
                )))
            }
            Ok(Err(e)) => {
                warn!(%job_id, error = %e, "Viewshed job failed");
                self.finish(job_id, AnalysisStatus::Failed);
                Err(e)
            }
            Err(_) => {
                info!(%job_id, "Superseded while computing");
                self.finish(job_id, AnalysisStatus::Stale);
                Ok(AnalysisOutcome::Superseded)
            }
        }
    }

    /// Wait for the engine, then fetch, stitch, project and dispatch.
    /// `Ok(false)` means the job was superseded and nothing was sent to the
    /// engine.
    async fn prepare_and_dispatch(&self, job_id: JobId, request: &ViewshedRequest) -> Result<bool> {
        let config = &self.config;
        let GeoPoint { lat, lon, .. } = request.observer;

        let zoom = config.zoom_for(request.max_distance_m);
        let center = TileAddress::from_lat_lon(lat, lon, zoom)?;
        let tile_radius = required_tile_radius(lat, zoom, request.max_distance_m);
        self.publish(job_id, AnalysisStatus::Fetching, config.progress_floor);

        self.engine
            .await_ready(config.ready_retries, config.ready_backoff())
            .await?;
        if !self.jobs.is_current(job_id) {
            return Ok(false);
        }

        let r = tile_radius as i64;
        let addresses: Vec<TileAddress> = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
            .filter_map(|(dx, dy)| center.offset(dx, dy))
            .collect();
        let total = addresses.len();
        debug!(%job_id, %center, tile_radius, tiles = total, "Fetching tiles");

        let mut fetches: FuturesUnordered<_> = addresses
            .into_iter()
            .map(|address| fetch_elevation_tile(&self.source, address))
            .collect();
        let mut tiles = Vec::with_capacity(total);
        let mut done = 0;
        while let Some(tile) = fetches.next().await {
            done += 1;
            tiles.extend(tile);
            self.publish(job_id, AnalysisStatus::Fetching, config.fetch_percent(done, total));
        }

        if !self.jobs.is_current(job_id) {
            return Ok(false);
        }
        if tiles.is_empty() {
            return Err(ViewshedError::NoElevationData { lat, lon });
        }
        debug!(%job_id, fetched = tiles.len(), requested = total, "Tiles fetched");

        self.publish(job_id, AnalysisStatus::Stitching, config.stitch_percent);
        let grid = stitch_tiles(tiles, center, tile_radius, config.tile_size);
        let observer = grid.project(&request.observer);
        let gsd_m = ground_sample_distance(lat, zoom, config.tile_size);
        let radius_px = (request.max_distance_m / gsd_m).floor().min(i32::MAX as f64) as i32;

        let metadata = JobMetadata {
            center,
            tile_radius,
            width: grid.width(),
            height: grid.height(),
            bounds: grid.bounds(),
            observer,
            gsd_m,
            radius_px,
        };
        let (observer_x, observer_y) = observer.pixel();
        let elevation = grid.into_data();
        if elevation.is_empty() {
            return Err(ViewshedError::Precondition(
                "stitched elevation buffer is empty".to_string(),
            ));
        }
        let job = ViewshedJob {
            elevation,
            width: metadata.width,
            height: metadata.height,
            observer_x: observer_x as i32,
            observer_y: observer_y as i32,
            observer_height_m: request.observer_height_m as f32,
            max_distance_px: radius_px,
            gsd_m: gsd_m as f32,
        };

        match self
            .jobs
            .bind(job_id, metadata, || self.engine.dispatch(job_id, job))
        {
            None => Ok(false),
            Some(sent) => {
                sent?;
                info!(%job_id, observer_x, observer_y, radius_px, gsd_m, "Viewshed job dispatched");
                self.publish(job_id, AnalysisStatus::Dispatched, config.stitch_percent);
                Ok(true)
            }
        }
    }

    /// Publish progress while `job_id` is the current job.
    fn publish(&self, job_id: JobId, status: AnalysisStatus, percent: u8) {
        self.jobs.while_current(job_id, || {
            self.progress.send_replace(AnalysisProgress {
                job_id: Some(job_id),
                status,
                percent,
            });
        });
    }

    /// Record a terminal status unless a newer job has already reported.
    fn finish(&self, job_id: JobId, status: AnalysisStatus) {
        self.progress.send_if_modified(|progress| {
            if progress.job_id != Some(job_id) {
                return false;
            }
            progress.status = status;
            if status == AnalysisStatus::Fulfilled {
                progress.percent = 100;
            }
            true
        });
    }
}

/// Route engine reports to the requests waiting on them.
async fn route_reports(mut reports: mpsc::UnboundedReceiver<EngineReport>, jobs: Arc<JobTable>) {
    while let Some(report) = reports.recv().await {
        match report {
            EngineReport::Ready => debug!("Engine reported ready"),
            EngineReport::InitFailed(e) => {
                error!(error = %e, "Engine failed to initialize");
            }
            EngineReport::ViewshedDone { job_id, mask } => match jobs.resolve(job_id) {
                Some(job) => {
                    info!(%job_id, visible = mask.visible_count(), "Viewshed fulfilled");
                    job.complete(mask);
                }
                None => debug!(%job_id, "Dropping stale viewshed result"),
            },
            EngineReport::Failed { job_id, error } => match jobs.resolve(job_id) {
                Some(job) => job.fail(ViewshedError::Kernel(error)),
                None => debug!(%job_id, error = %error, "Dropping stale viewshed failure"),
            },
        }
    }

    for job in jobs.drain() {
        job.fail(ViewshedError::EngineUnavailable(
            "engine thread has stopped".to_string(),
        ));
    }
}
