//! Error types for kernel operations

use thiserror::Error;

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors that can occur when calling the numeric engine
#[derive(Debug, Error)]
pub enum KernelError {
    /// Failed to load the engine library
    #[error("Failed to load engine library: {0}")]
    LoadError(String),

    /// Failed to find a symbol in the engine library
    #[error("Symbol not found in engine library: {0}")]
    SymbolNotFound(String),

    /// Job was rejected before reaching the engine
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    // Engine status codes

    /// Grid dimensions are zero, negative or do not match the buffer
    #[error("Grid dimensions rejected by engine")]
    InvalidDimensions,

    /// Observer pixel lies outside the grid
    #[error("Observer position outside grid")]
    ObserverOutOfBounds,

    /// Link parameters out of range
    #[error("Link parameters rejected by engine")]
    InvalidParameters,

    /// Profile too short or malformed
    #[error("Invalid terrain profile")]
    InvalidProfile,

    /// Engine could not allocate working memory
    #[error("Engine out of memory")]
    OutOfMemory,

    /// Unknown status code from the engine
    #[error("Engine error code: {0}")]
    Unknown(i32),
}

impl KernelError {
    /// Convert an engine status code to a KernelError
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => KernelError::InvalidDimensions,
            2 => KernelError::ObserverOutOfBounds,
            3 => KernelError::InvalidParameters,
            4 => KernelError::InvalidProfile,
            5 => KernelError::OutOfMemory,
            _ => KernelError::Unknown(code),
        }
    }
}
