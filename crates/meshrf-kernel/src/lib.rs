//! # meshrf-kernel
//!
//! Boundary to the numeric engine that computes viewsheds and radial path
//! loss. The engine is a black box: the same input always gives the same
//! output and no state is carried between calls.
//!
//! The [`Kernel`] trait is the seam. [`NativeKernel`] loads the engine shared
//! library at runtime with `libloading`; tests substitute their own kernels.
//!
//! ```no_run
//! use meshrf_kernel::{Kernel, NativeKernel, ViewshedJob};
//!
//! let kernel = NativeKernel::load("./libmeshrf.so")?;
//! let job = ViewshedJob {
//!     elevation: vec![100.0; 256 * 256],
//!     width: 256,
//!     height: 256,
//!     observer_x: 128,
//!     observer_y: 128,
//!     observer_height_m: 10.0,
//!     max_distance_px: 100,
//!     gsd_m: 30.0,
//! };
//! let mask = kernel.compute_viewshed(&job)?;
//! println!("{} cells visible", mask.visible_count());
//! # Ok::<(), meshrf_kernel::KernelError>(())
//! ```

mod error;
pub mod ffi;
mod native;
mod types;

pub use error::{KernelError, KernelResult};
pub use native::{default_library_name, NativeKernel};
pub use types::{
    ground_constants, Climate, KernelParameters, Polarization, ViewshedJob, VisibilityMask,
    FAILED_SAMPLE_LOSS_DB,
};

/// Numeric engine for visibility and path-loss computations.
pub trait Kernel: Send {
    /// Per-cell visibility of the grid from the job's observer.
    fn compute_viewshed(&self, job: &ViewshedJob) -> KernelResult<VisibilityMask>;

    /// Path loss in dB at every sample of a terrain profile.
    ///
    /// Sample 0 is the transmitter and carries 0 dB; samples the engine could
    /// not evaluate carry [`FAILED_SAMPLE_LOSS_DB`].
    fn compute_path_loss(
        &self,
        profile: &[f32],
        params: &KernelParameters,
    ) -> KernelResult<Vec<f32>>;
}

impl<K: Kernel + ?Sized> Kernel for Box<K> {
    fn compute_viewshed(&self, job: &ViewshedJob) -> KernelResult<VisibilityMask> {
        (**self).compute_viewshed(job)
    }

    fn compute_path_loss(
        &self,
        profile: &[f32],
        params: &KernelParameters,
    ) -> KernelResult<Vec<f32>> {
        (**self).compute_path_loss(profile, params)
    }
}
