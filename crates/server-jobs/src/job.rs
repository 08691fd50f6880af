//! The per-user archive job and its state machine.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::types::{JobSnapshot, JobStatus, StartOutcome};
use crate::worker::{self, ArchiveExporter};

/// Mutable job fields. Only ever touched while holding [`Job::inner`].
struct Inner {
    status: JobStatus,
    progress: f64,
    result: Option<PathBuf>,
    error: Option<String>,
    /// Bumped by every start and reset. A worker only writes while the
    /// generation it was started with is still current.
    generation: u64,
    cancel: Option<CancellationToken>,
}

impl Inner {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.status,
            progress: self.progress,
            result_available: self.result.is_some(),
            error: self.error.clone(),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.status == JobStatus::Running
    }
}

/// One user's archive export: Idle → Running → Done (or Failed), back to
/// Idle on reset.
///
/// The lock is held only for field access, never across an `.await`, so
/// readers are not blocked while the worker sleeps between steps.
pub struct Job {
    user_id: String,
    inner: Mutex<Inner>,
    exporter: Arc<dyn ArchiveExporter>,
    launches: AtomicU64,
    progress_tx: broadcast::Sender<JobSnapshot>,
}

impl Job {
    pub fn new(user_id: impl Into<String>, exporter: Arc<dyn ArchiveExporter>) -> Self {
        let (progress_tx, _) = broadcast::channel(64);
        Self {
            user_id: user_id.into(),
            inner: Mutex::new(Inner {
                status: JobStatus::Idle,
                progress: 0.0,
                result: None,
                error: None,
                generation: 0,
                cancel: None,
            }),
            exporter,
            launches: AtomicU64::new(0),
            progress_tx,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub(crate) fn exporter(&self) -> Arc<dyn ArchiveExporter> {
        Arc::clone(&self.exporter)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| {
            tracing::error!(user_id = %self.user_id, "Mutex poisoned on archive job: {e}");
            e.into_inner()
        })
    }

    /// Publish the current state. Called with the lock held so subscribers
    /// see transitions in the order they happened.
    fn publish(&self, inner: &Inner) {
        // No subscribers is fine.
        let _ = self.progress_tx.send(inner.snapshot());
    }

    /// Start an export if the job is idle.
    ///
    /// The idle check and the transition to Running happen in one critical
    /// section, so concurrent callers schedule at most one worker. Any other
    /// status makes this a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> StartOutcome {
        let (generation, cancel) = {
            let mut inner = self.lock();
            if inner.status != JobStatus::Idle {
                tracing::debug!(user_id = %self.user_id, status = %inner.status, "Archive start ignored");
                return StartOutcome::AlreadyActive(inner.status);
            }
            let cancel = CancellationToken::new();
            inner.status = JobStatus::Running;
            inner.progress = 0.0;
            inner.result = None;
            inner.error = None;
            inner.generation += 1;
            inner.cancel = Some(cancel.clone());
            self.publish(&inner);
            (inner.generation, cancel)
        };

        self.launches.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(worker::run(Arc::clone(self), generation, cancel));
        StartOutcome::Started
    }

    /// Return to Idle from any state, clearing progress, result and error.
    ///
    /// An in-flight run is cancelled and can no longer write to this job.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        let previous = inner.status;
        inner.generation += 1;
        inner.status = JobStatus::Idle;
        inner.progress = 0.0;
        inner.result = None;
        inner.error = None;
        self.publish(&inner);
        tracing::debug!(user_id = %self.user_id, previous = %previous, "Archive job reset");
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.lock().snapshot()
    }

    pub fn status(&self) -> JobStatus {
        self.lock().status
    }

    /// The finished archive, or `None` until the job is Done.
    pub fn result(&self) -> Option<PathBuf> {
        let inner = self.lock();
        match inner.status {
            JobStatus::Done => inner.result.clone(),
            _ => None,
        }
    }

    /// Subscribe to snapshots published on every transition and progress step.
    pub fn subscribe(&self) -> broadcast::Receiver<JobSnapshot> {
        self.progress_tx.subscribe()
    }

    /// Number of workers this job has ever scheduled.
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    /// Record progress for run `generation`. Progress only moves forward and
    /// stays within `0.0..=1.0`. Returns `false` if the run is no longer
    /// current.
    pub(crate) fn report_progress(&self, generation: u64, fraction: f64) -> bool {
        let mut inner = self.lock();
        if !inner.is_current(generation) {
            return false;
        }
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        if fraction > inner.progress {
            inner.progress = fraction;
            self.publish(&inner);
        }
        true
    }

    /// Running → Done with `result`. Returns `false` if the run is no longer
    /// current, in which case nothing changes.
    pub(crate) fn complete(&self, generation: u64, result: PathBuf) -> bool {
        let mut inner = self.lock();
        if !inner.is_current(generation) {
            return false;
        }
        inner.status = JobStatus::Done;
        inner.progress = 1.0;
        inner.result = Some(result);
        inner.cancel = None;
        self.publish(&inner);
        true
    }

    /// Running → Failed with `cause`. Returns `false` if the run is no longer
    /// current.
    pub(crate) fn fail(&self, generation: u64, cause: String) -> bool {
        let mut inner = self.lock();
        if !inner.is_current(generation) {
            return false;
        }
        inner.status = JobStatus::Failed;
        inner.error = Some(cause);
        inner.cancel = None;
        self.publish(&inner);
        true
    }

    pub(crate) fn generation(&self) -> u64 {
        self.lock().generation
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("user_id", &self.user_id)
            .field("snapshot", &self.snapshot())
            .field("launches", &self.launches())
            .finish()
    }
}
