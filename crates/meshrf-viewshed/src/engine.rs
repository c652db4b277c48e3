//! Background computation context for the numeric engine.
//!
//! The engine runs on one dedicated thread that owns the [`Kernel`]. The
//! kernel is built on that thread by a caller-supplied factory, so loading a
//! native library never blocks the async side. Jobs go in over a
//! `crossbeam-channel` and reports come back over a tokio channel.
//!
//! ## Key Types
//!
//! - [`EngineHandle`]: Sending side, readiness checks and shutdown
//! - [`EngineCommand`]: Messages to the engine thread
//! - [`EngineReport`]: Messages from the engine thread

use crate::jobs::JobId;
use crate::{Result, ViewshedError};
use crossbeam_channel::{Receiver, Sender};
use meshrf_kernel::{Kernel, KernelError, KernelResult, ViewshedJob, VisibilityMask};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const STARTING: u8 = 0;
const READY: u8 = 1;
const FAILED: u8 = 2;
const STOPPED: u8 = 3;

// ============================================================================
// Messages
// ============================================================================

/// Commands sent to the engine thread.
#[derive(Debug)]
pub enum EngineCommand {
    /// Compute a viewshed. The elevation buffer moves with the job.
    Viewshed { job_id: JobId, job: ViewshedJob },

    /// Stop the engine thread.
    Shutdown,
}

/// Reports sent from the engine thread.
#[derive(Debug)]
pub enum EngineReport {
    /// The kernel was built and jobs may be dispatched.
    Ready,

    /// The kernel factory failed; the thread has exited.
    InitFailed(KernelError),

    /// A job finished.
    ViewshedDone { job_id: JobId, mask: VisibilityMask },

    /// A job was rejected or failed inside the kernel.
    Failed { job_id: JobId, error: KernelError },
}

// ============================================================================
// Handle
// ============================================================================

/// Handle to the engine thread.
///
/// Dropping the handle asks the thread to stop without waiting for it.
#[derive(Debug)]
pub struct EngineHandle {
    cmd_tx: Sender<EngineCommand>,
    state: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Whether the kernel has finished initializing.
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Wait for the engine to become ready, checking up to `retries` more
    /// times with `backoff` between checks.
    ///
    /// Fails immediately if the kernel factory failed or the thread stopped.
    pub async fn await_ready(&self, retries: u32, backoff: Duration) -> Result<()> {
        for attempt in 0..=retries {
            match self.state.load(Ordering::Acquire) {
                READY => return Ok(()),
                FAILED => {
                    return Err(ViewshedError::EngineUnavailable(
                        "engine failed to initialize".to_string(),
                    ))
                }
                STOPPED => {
                    return Err(ViewshedError::EngineUnavailable(
                        "engine has stopped".to_string(),
                    ))
                }
                _ => {}
            }
            if attempt < retries {
                debug!(attempt, "Engine not ready, retrying");
                tokio::time::sleep(backoff).await;
            }
        }

        Err(ViewshedError::EngineUnavailable(format!(
            "engine not ready after {} retries",
            retries
        )))
    }

    /// Hand a job to the engine thread.
    pub fn dispatch(&self, job_id: JobId, job: ViewshedJob) -> Result<()> {
        if !self.is_ready() {
            return Err(ViewshedError::Precondition(format!(
                "job {} dispatched before the engine was ready",
                job_id
            )));
        }
        self.cmd_tx
            .send(EngineCommand::Viewshed { job_id, job })
            .map_err(|_| ViewshedError::EngineUnavailable("engine thread has stopped".to_string()))
    }

    /// Stop the engine thread and wait for it to exit.
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Engine thread panicked");
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        }
    }
}

// ============================================================================
// Thread
// ============================================================================

/// Start the engine thread.
///
/// `factory` runs on the new thread; [`EngineReport::Ready`] or
/// [`EngineReport::InitFailed`] follows once it returns.
pub fn spawn_engine<F>(factory: F) -> Result<(EngineHandle, mpsc::UnboundedReceiver<EngineReport>)>
where
    F: FnOnce() -> KernelResult<Box<dyn Kernel>> + Send + 'static,
{
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let (report_tx, report_rx) = mpsc::unbounded_channel();
    let state = Arc::new(AtomicU8::new(STARTING));
    let thread_state = Arc::clone(&state);

    let thread = thread::Builder::new()
        .name("meshrf-engine".to_string())
        .spawn(move || engine_main(factory, cmd_rx, report_tx, thread_state))?;

    Ok((
        EngineHandle {
            cmd_tx,
            state,
            thread: Some(thread),
        },
        report_rx,
    ))
}

/// Main function of the engine thread.
///
/// Blocks on commands until [`EngineCommand::Shutdown`] or until every
/// sender is gone.
fn engine_main<F>(
    factory: F,
    cmd_rx: Receiver<EngineCommand>,
    report_tx: mpsc::UnboundedSender<EngineReport>,
    state: Arc<AtomicU8>,
) where
    F: FnOnce() -> KernelResult<Box<dyn Kernel>>,
{
    let kernel = match factory() {
        Ok(kernel) => kernel,
        Err(e) => {
            error!(error = %e, "Engine initialization failed");
            state.store(FAILED, Ordering::Release);
            let _ = report_tx.send(EngineReport::InitFailed(e));
            return;
        }
    };

    state.store(READY, Ordering::Release);
    info!("Engine ready");
    let _ = report_tx.send(EngineReport::Ready);

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            EngineCommand::Viewshed { job_id, job } => {
                debug!(
                    %job_id,
                    width = job.width,
                    height = job.height,
                    radius_px = job.max_distance_px,
                    "Computing viewshed"
                );
                let report = match job.validate().and_then(|()| kernel.compute_viewshed(&job)) {
                    Ok(mask) => EngineReport::ViewshedDone { job_id, mask },
                    Err(error) => EngineReport::Failed { job_id, error },
                };
                if report_tx.send(report).is_err() {
                    // Nobody is listening for results any more
                    break;
                }
            }
            EngineCommand::Shutdown => break,
        }
    }

    state.store(STOPPED, Ordering::Release);
    debug!("Engine thread exiting");
}
