//! Correlation of dispatched viewshed jobs with their results.
//!
//! Every analysis registers a [`PendingJob`] under a fresh [`JobId`].
//! Starting a new analysis removes all other entries, which is how an older
//! request is cancelled: its responder is dropped and the engine's late
//! result for that id finds nothing to resolve.

use crate::ViewshedError;
use meshrf_kernel::VisibilityMask;
use meshrf_tiles::{ObserverProjection, TileAddress, TileBounds};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::oneshot;
use tracing::debug;

/// Identifier of one dispatched analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vs-{}", self.0)
    }
}

/// Geographic context of a job, captured when it is dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct JobMetadata {
    /// Tile the grid is centred on.
    pub center: TileAddress,
    pub tile_radius: u32,
    /// Grid width in pixels.
    pub width: usize,
    /// Grid height in pixels.
    pub height: usize,
    /// Geographic bounds of the grid.
    pub bounds: TileBounds,
    /// Observer position in grid pixels.
    pub observer: ObserverProjection,
    /// Ground sample distance at the observer (meters per pixel).
    pub gsd_m: f64,
    /// Analysis radius in pixels.
    pub radius_px: i32,
}

/// A finished job with the context it was dispatched under.
#[derive(Debug)]
pub struct CompletedJob {
    pub metadata: JobMetadata,
    pub mask: VisibilityMask,
}

/// What the waiting analysis receives.
pub type JobOutcome = std::result::Result<CompletedJob, ViewshedError>;

/// An entry in the [`JobTable`].
#[derive(Debug)]
pub struct PendingJob {
    metadata: Option<JobMetadata>,
    responder: oneshot::Sender<JobOutcome>,
}

impl PendingJob {
    /// Metadata bound at dispatch, if the job got that far.
    pub fn metadata(&self) -> Option<&JobMetadata> {
        self.metadata.as_ref()
    }

    /// Deliver the engine's mask to the waiting analysis.
    pub fn complete(self, mask: VisibilityMask) {
        let outcome = match self.metadata {
            Some(metadata) => Ok(CompletedJob { metadata, mask }),
            None => Err(ViewshedError::Precondition(
                "result arrived for a job that was never dispatched".to_string(),
            )),
        };
        // The receiver may already be gone if the caller was dropped.
        let _ = self.responder.send(outcome);
    }

    /// Deliver an error to the waiting analysis.
    pub fn fail(self, error: ViewshedError) {
        let _ = self.responder.send(Err(error));
    }
}

#[derive(Debug, Default)]
struct TableState {
    last_id: u64,
    pending: HashMap<JobId, PendingJob>,
}

/// Map from job id to the analysis waiting on it.
#[derive(Debug, Default)]
pub struct JobTable {
    state: Mutex<TableState>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job, superseding every other one.
    ///
    /// Returns the job's id and the receiver its result will arrive on.
    pub fn begin(&self) -> (JobId, oneshot::Receiver<JobOutcome>) {
        let (responder, receiver) = oneshot::channel();
        let mut state = self.state.lock();
        state.last_id += 1;
        let id = JobId(state.last_id);

        for (old, _) in state.pending.drain() {
            debug!(job_id = %old, superseded_by = %id, "Superseding job");
        }
        state.pending.insert(
            id,
            PendingJob {
                metadata: None,
                responder,
            },
        );
        (id, receiver)
    }

    /// Whether `id` is still waiting for a result.
    pub fn is_current(&self, id: JobId) -> bool {
        self.state.lock().pending.contains_key(&id)
    }

    /// Run `f` under the table lock if `id` is still current.
    ///
    /// No other job can begin while `f` runs.
    pub fn while_current<T>(&self, id: JobId, f: impl FnOnce() -> T) -> Option<T> {
        let state = self.state.lock();
        state.pending.contains_key(&id).then(f)
    }

    /// Attach metadata to `id` and run `send` under the same lock.
    ///
    /// Returns `None` without calling `send` if `id` has been superseded, so a
    /// result can never arrive for a job whose metadata is not yet bound.
    pub fn bind<T>(&self, id: JobId, metadata: JobMetadata, send: impl FnOnce() -> T) -> Option<T> {
        let mut state = self.state.lock();
        let job = state.pending.get_mut(&id)?;
        job.metadata = Some(metadata);
        Some(send())
    }

    /// Remove and return the entry for `id`; `None` means the result is stale.
    pub fn resolve(&self, id: JobId) -> Option<PendingJob> {
        self.state.lock().pending.remove(&id)
    }

    /// Drop the entry for `id`. Returns whether it was present.
    pub fn cancel(&self, id: JobId) -> bool {
        self.state.lock().pending.remove(&id).is_some()
    }

    /// Remove every entry.
    pub fn drain(&self) -> Vec<PendingJob> {
        self.state.lock().pending.drain().map(|(_, job)| job).collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot::error::TryRecvError;

    fn metadata() -> JobMetadata {
        let center = TileAddress {
            x: 10,
            y: 20,
            zoom: 5,
        };
        JobMetadata {
            center,
            tile_radius: 1,
            width: 3,
            height: 3,
            bounds: center.bounds(),
            observer: ObserverProjection { x: 1.5, y: 1.5 },
            gsd_m: 30.0,
            radius_px: 2,
        }
    }

    fn mask() -> VisibilityMask {
        VisibilityMask::new(vec![1; 9], 3, 3).unwrap()
    }

    #[test]
    fn test_ids_increase_and_display() {
        let table = JobTable::new();
        let (a, _rx_a) = table.begin();
        let (b, _rx_b) = table.begin();
        assert!(b > a);
        assert_eq!(a.to_string(), "vs-1");
        assert_eq!(b.as_u64(), 2);
    }

    #[test]
    fn test_begin_supersedes_previous() {
        let table = JobTable::new();
        let (a, mut rx_a) = table.begin();
        let (b, _rx_b) = table.begin();

        assert!(!table.is_current(a));
        assert!(table.is_current(b));
        assert_eq!(table.len(), 1);
        assert!(matches!(rx_a.try_recv(), Err(TryRecvError::Closed)));
    }

    #[test]
    fn test_bind_skips_send_for_superseded_job() {
        let table = JobTable::new();
        let (a, _rx_a) = table.begin();
        table.begin();

        let mut sent = false;
        assert!(table.bind(a, metadata(), || sent = true).is_none());
        assert!(!sent);
    }

    #[test]
    fn test_while_current_holds_off_new_jobs() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::time::Duration;

        let table = Arc::new(JobTable::new());
        let (a, _rx_a) = table.begin();
        let begun = Arc::new(AtomicBool::new(false));

        let handle = table
            .while_current(a, || {
                let table = Arc::clone(&table);
                let begun_in_thread = Arc::clone(&begun);
                let handle = std::thread::spawn(move || {
                    let (b, _rx_b) = table.begin();
                    begun_in_thread.store(true, Ordering::SeqCst);
                    b
                });
                std::thread::sleep(Duration::from_millis(50));
                assert!(!begun.load(Ordering::SeqCst));
                handle
            })
            .unwrap();

        let b = handle.join().unwrap();
        assert!(begun.load(Ordering::SeqCst));
        let mut ran = false;
        assert!(table.while_current(a, || ran = true).is_none());
        assert!(!ran);
        assert_eq!(table.while_current(b, || 3), Some(3));
    }

    #[test]
    fn test_stale_result_has_nothing_to_resolve() {
        let table = JobTable::new();
        let (a, _rx_a) = table.begin();
        let (_b, _rx_b) = table.begin();
        assert!(table.resolve(a).is_none());
    }

    #[test]
    fn test_resolve_delivers_bound_metadata() {
        let table = JobTable::new();
        let (id, mut rx) = table.begin();
        assert_eq!(table.bind(id, metadata(), || 7), Some(7));

        let job = table.resolve(id).unwrap();
        assert_eq!(job.metadata(), Some(&metadata()));
        job.complete(mask());

        let completed = rx.try_recv().unwrap().unwrap();
        assert_eq!(completed.metadata.width, 3);
        assert_eq!(completed.mask.visible_count(), 9);
        assert!(table.is_empty());
    }

    #[test]
    fn test_unbound_completion_is_a_precondition_error() {
        let table = JobTable::new();
        let (id, mut rx) = table.begin();
        table.resolve(id).unwrap().complete(mask());
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(ViewshedError::Precondition(_))
        ));
    }
}
