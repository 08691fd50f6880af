//! The task that drives a running job to completion.
//!
//! A worker is spawned by [`Job::start`] and owns the rest of the run: it
//! calls the job's [`ArchiveExporter`], then records Done or Failed. The run's
//! cancellation token is raced against the export, so a reset stops the
//! worker at once rather than letting it finish in the background.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::job::Job;

/// Result handle reported by the simulated export.
pub const SIMULATED_ARCHIVE_PATH: &str = "/path/to/archive.zip";

/// Errors an export can end with.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Export failed: {0}")]
    Failed(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error("Export task panicked")]
    Panicked,
}

/// The work a job performs. Implementations report progress through the
/// given [`ProgressReporter`] and return the path of the finished archive.
#[async_trait]
pub trait ArchiveExporter: Send + Sync + 'static {
    async fn export(
        &self,
        user_id: &str,
        progress: &ProgressReporter,
    ) -> Result<PathBuf, ExportError>;
}

/// Write access to one run of one job.
///
/// Reports are dropped once the job has been reset, and the reporter then
/// answers [`ExportError::Cancelled`] so exporters can stop early.
#[derive(Clone)]
pub struct ProgressReporter {
    job: Arc<Job>,
    generation: u64,
    cancel: CancellationToken,
}

impl ProgressReporter {
    pub fn report(&self, fraction: f64) -> Result<(), ExportError> {
        if self.cancel.is_cancelled() || !self.job.report_progress(self.generation, fraction) {
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }

    /// True once the run was cancelled or the job has moved to a newer run.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.job.generation() != self.generation
    }
}

/// Fixed pacing for a progress loop: `steps + 1` reports from 0.0 to 1.0,
/// each preceded by a sleep of `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSchedule {
    pub steps: u32,
    pub interval: Duration,
}

impl StepSchedule {
    pub fn new(steps: u32, interval: Duration) -> Self {
        Self { steps, interval }
    }

    /// Total time a full run sleeps.
    pub fn duration(&self) -> Duration {
        self.interval.saturating_mul(self.steps.saturating_add(1))
    }

    pub async fn run(&self, progress: &ProgressReporter) -> Result<(), ExportError> {
        for i in 0..=self.steps {
            tokio::time::sleep(self.interval).await;
            let fraction = if self.steps == 0 {
                1.0
            } else {
                f64::from(i) / f64::from(self.steps)
            };
            progress.report(fraction)?;
        }
        Ok(())
    }
}

impl Default for StepSchedule {
    /// 101 reports, 50 ms apart.
    fn default() -> Self {
        Self::new(100, Duration::from_millis(50))
    }
}

/// Export that does no I/O: it walks the schedule and reports a fixed path.
#[derive(Debug, Clone)]
pub struct SimulatedExporter {
    schedule: StepSchedule,
    result: PathBuf,
}

impl SimulatedExporter {
    pub fn new(schedule: StepSchedule, result: impl Into<PathBuf>) -> Self {
        Self {
            schedule,
            result: result.into(),
        }
    }
}

impl Default for SimulatedExporter {
    fn default() -> Self {
        Self::new(StepSchedule::default(), SIMULATED_ARCHIVE_PATH)
    }
}

#[async_trait]
impl ArchiveExporter for SimulatedExporter {
    async fn export(
        &self,
        _user_id: &str,
        progress: &ProgressReporter,
    ) -> Result<PathBuf, ExportError> {
        self.schedule.run(progress).await?;
        Ok(self.result.clone())
    }
}

/// Body of the task spawned by [`Job::start`] for run `generation`.
pub(crate) async fn run(job: Arc<Job>, generation: u64, cancel: CancellationToken) {
    let user_id = job.user_id().to_string();
    let reporter = ProgressReporter {
        job: Arc::clone(&job),
        generation,
        cancel: cancel.clone(),
    };
    let exporter = job.exporter();

    tracing::info!(user_id = %user_id, generation, "Archive export started");

    // The export runs in its own task so a panic surfaces as a JoinError
    // instead of leaving the job Running forever.
    let export_user = user_id.clone();
    let export = tokio::spawn(async move { exporter.export(&export_user, &reporter).await });
    let abort = export.abort_handle();

    let joined = tokio::select! {
        _ = cancel.cancelled() => {
            abort.abort();
            tracing::debug!(user_id = %user_id, generation, "Archive export cancelled");
            return;
        }
        joined = export => joined,
    };

    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(ExportError::Panicked),
        Err(_) => Err(ExportError::Cancelled),
    };

    match outcome {
        Ok(path) => {
            if job.complete(generation, path.clone()) {
                tracing::info!(user_id = %user_id, generation, path = %path.display(), "Archive export complete");
            } else {
                tracing::debug!(user_id = %user_id, generation, "Archive result discarded: job was reset");
            }
        }
        Err(ExportError::Cancelled) => {
            tracing::debug!(user_id = %user_id, generation, "Archive export stopped after reset");
        }
        Err(e) => {
            if job.fail(generation, e.to_string()) {
                tracing::warn!(user_id = %user_id, generation, error = %e, "Archive export failed");
            }
        }
    }
}
