//! Kernel backed by the native engine shared library.

use crate::ffi::{self, FnCalculateRadialLoss, FnCalculateViewshed};
use crate::{Kernel, KernelError, KernelParameters, KernelResult, ViewshedJob, VisibilityMask};
use libloading::Library;
use std::ffi::OsStr;
use tracing::{debug, info};

/// Platform file name of the engine library (`libmeshrf.so`, `meshrf.dll`, ...).
pub fn default_library_name() -> std::ffi::OsString {
    libloading::library_filename("meshrf")
}

/// Native engine loaded at runtime.
pub struct NativeKernel {
    viewshed: FnCalculateViewshed,
    radial_loss: FnCalculateRadialLoss,
    // Keeps the function pointers above valid.
    _library: Library,
}

impl std::fmt::Debug for NativeKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeKernel").finish_non_exhaustive()
    }
}

impl NativeKernel {
    /// Load the engine from a library path.
    pub fn load<P: AsRef<OsStr>>(path: P) -> KernelResult<Self> {
        let path = path.as_ref();
        // SAFETY: loading runs the library's initializers; the engine has none
        // beyond static data.
        let library = unsafe { Library::new(path) }
            .map_err(|e| KernelError::LoadError(format!("{}: {}", path.to_string_lossy(), e)))?;

        // SAFETY: the symbol types match the engine's exported C signatures.
        let viewshed = unsafe {
            *library
                .get::<FnCalculateViewshed>(ffi::VIEWSHED_SYMBOL)
                .map_err(|e| KernelError::SymbolNotFound(format!("meshrf_calculate_viewshed: {}", e)))?
        };
        let radial_loss = unsafe {
            *library
                .get::<FnCalculateRadialLoss>(ffi::RADIAL_LOSS_SYMBOL)
                .map_err(|e| {
                    KernelError::SymbolNotFound(format!("meshrf_calculate_radial_loss: {}", e))
                })?
        };

        info!(library = %path.to_string_lossy(), "Loaded native engine");

        Ok(Self {
            viewshed,
            radial_loss,
            _library: library,
        })
    }

    /// Load the engine by its platform default name from the library search path.
    pub fn load_default() -> KernelResult<Self> {
        Self::load(default_library_name())
    }
}

impl Kernel for NativeKernel {
    fn compute_viewshed(&self, job: &ViewshedJob) -> KernelResult<VisibilityMask> {
        job.validate()?;

        let mut visibility = vec![0u8; job.width * job.height];
        debug!(
            width = job.width,
            height = job.height,
            radius_px = job.max_distance_px,
            "Calling native viewshed"
        );

        // SAFETY: `validate` checked the buffer length against the dimensions
        // and `visibility` has the same cell count.
        let code = unsafe {
            (self.viewshed)(
                job.elevation.as_ptr(),
                job.width as i32,
                job.height as i32,
                job.observer_x,
                job.observer_y,
                job.observer_height_m,
                job.max_distance_px,
                job.gsd_m,
                visibility.as_mut_ptr(),
            )
        };
        if code != 0 {
            return Err(KernelError::from_code(code));
        }

        VisibilityMask::new(visibility, job.width, job.height)
    }

    fn compute_path_loss(
        &self,
        profile: &[f32],
        params: &KernelParameters,
    ) -> KernelResult<Vec<f32>> {
        if profile.len() < 2 || profile.len() > i32::MAX as usize {
            return Err(KernelError::InvalidProfile);
        }

        let c_params = params.to_ffi();
        let mut loss = vec![0f32; profile.len()];

        // SAFETY: `loss` holds exactly `profile.len()` floats.
        let code = unsafe {
            (self.radial_loss)(
                profile.as_ptr(),
                profile.len() as i32,
                &c_params,
                loss.as_mut_ptr(),
            )
        };
        if code != 0 {
            return Err(KernelError::from_code(code));
        }

        Ok(loss)
    }
}
