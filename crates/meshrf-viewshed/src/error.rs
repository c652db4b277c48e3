//! Error types for viewshed analysis

use meshrf_kernel::KernelError;
use meshrf_tiles::TileError;
use thiserror::Error;

/// Errors that can end a viewshed analysis
#[derive(Debug, Error)]
pub enum ViewshedError {
    /// Request fields out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every tile in the neighbourhood failed to fetch or decode
    #[error("No elevation data available around ({lat:.5}, {lon:.5})")]
    NoElevationData { lat: f64, lon: f64 },

    /// The engine never became ready, failed to start or has stopped
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Caller bug, such as dispatching an empty elevation buffer
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Could not start the engine thread
    #[error("Failed to spawn engine thread: {0}")]
    EngineSpawn(#[from] std::io::Error),

    /// The engine rejected or failed the job
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// Tile addressing error
    #[error("Tile error: {0}")]
    Tiles(#[from] TileError),
}
