//! Types for the archive job system.

use serde::Serialize;

/// Status of a user's archive job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Done,
    /// The export failed; only a reset leaves this state.
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a job's observable state.
///
/// Always taken under the job's lock, so `status`, `progress` and
/// `result_available` describe the same instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub progress: f64,
    pub result_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobSnapshot {
    pub fn idle() -> Self {
        Self {
            status: JobStatus::Idle,
            progress: 0.0,
            result_available: false,
            error: None,
        }
    }

    /// Progress as a percentage in `0.0..=100.0`, for progress bars.
    pub fn percent(&self) -> f64 {
        (self.progress * 100.0).clamp(0.0, 100.0)
    }
}

/// What a call to [`crate::Job::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The job was idle and a worker has been scheduled.
    Started,
    /// The job was not idle; nothing was scheduled. Carries the status seen.
    AlreadyActive(JobStatus),
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }
}
