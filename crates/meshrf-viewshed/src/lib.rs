//! # meshrf-viewshed
//!
//! Orchestration of single-point visibility analysis.
//!
//! A [`ViewshedRequest`] is turned into a [`ViewshedLayer`] by:
//! 1. Choosing a zoom level and tile radius for the analysis distance
//! 2. Fetching every tile of the `(2r+1) × (2r+1)` neighbourhood concurrently
//! 3. Stitching what arrived into one grid (missing tiles stay at 0 m)
//! 4. Projecting the observer into grid pixels
//! 5. Moving the grid to the engine thread and waiting for the mask
//!
//! Only the latest request is live. Starting a new one supersedes the
//! previous request, whose late result is dropped.
//!
//! ## Example
//!
//! ```no_run
//! use meshrf_kernel::{Kernel, NativeKernel};
//! use meshrf_tiles::{GeoPoint, HttpTileSource, TileSourceConfig};
//! use meshrf_viewshed::{AnalysisOutcome, ViewshedConfig, ViewshedOrchestrator, ViewshedRequest};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpTileSource::new(&TileSourceConfig::default())?;
//! let orchestrator = ViewshedOrchestrator::start(
//!     source,
//!     || NativeKernel::load_default().map(|k| Box::new(k) as Box<dyn Kernel>),
//!     ViewshedConfig::default(),
//! )?;
//!
//! let request = ViewshedRequest::new(GeoPoint::new(47.6062, -122.3321), 10.0, 5_000.0);
//! if let AnalysisOutcome::Completed(layer) = orchestrator.run(request).await? {
//!     println!("{} cells visible", layer.visible_count());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
pub mod engine;
mod error;
pub mod jobs;
mod orchestrator;

pub use config::ViewshedConfig;
pub use engine::{spawn_engine, EngineHandle, EngineReport};
pub use error::ViewshedError;
pub use jobs::{JobId, JobMetadata, JobTable};
pub use orchestrator::{
    AnalysisOutcome, AnalysisProgress, AnalysisStatus, ViewshedLayer, ViewshedOrchestrator,
    ViewshedRequest,
};

/// Result type for viewshed operations.
pub type Result<T> = std::result::Result<T, ViewshedError>;
