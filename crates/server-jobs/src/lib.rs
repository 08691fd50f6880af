//! Per-user archive export jobs.
//!
//! Provides:
//! - `JobRegistry` - owns one job per user, created on first lookup
//! - `Job` - Idle/Running/Done/Failed state machine with progress and result
//! - `ArchiveExporter` - the work a job's worker performs
//! - `JobSnapshot` - consistent copy of a job's state for rendering

pub mod job;
pub mod registry;
pub mod types;
pub mod worker;

pub use job::Job;
pub use registry::JobRegistry;
pub use types::{JobSnapshot, JobStatus, StartOutcome};
pub use worker::{
    ArchiveExporter, ExportError, ProgressReporter, SimulatedExporter, StepSchedule,
    SIMULATED_ARCHIVE_PATH,
};
