//! Per-user table of archive jobs.

use std::sync::Arc;

use dashmap::DashMap;

use crate::job::Job;
use crate::types::{JobSnapshot, JobStatus};
use crate::worker::{ArchiveExporter, SimulatedExporter};

/// Owns exactly one [`Job`] per user id for the life of the process.
///
/// Entries are created lazily on first lookup and never removed. Creation
/// goes through the map's per-key entry lock, so racing first lookups of the
/// same id all receive the same job.
pub struct JobRegistry {
    jobs: DashMap<String, Arc<Job>>,
    exporter: Arc<dyn ArchiveExporter>,
}

impl JobRegistry {
    /// Registry whose jobs all run `exporter`.
    pub fn new(exporter: Arc<dyn ArchiveExporter>) -> Self {
        Self {
            jobs: DashMap::new(),
            exporter,
        }
    }

    /// The job for `user_id`, created Idle if this is the first lookup.
    pub fn get_or_create(&self, user_id: &str) -> Arc<Job> {
        if let Some(job) = self.jobs.get(user_id) {
            return Arc::clone(job.value());
        }
        let entry = self.jobs.entry(user_id.to_string()).or_insert_with(|| {
            tracing::debug!(user_id = %user_id, "Creating archive job");
            Arc::new(Job::new(user_id, Arc::clone(&self.exporter)))
        });
        Arc::clone(entry.value())
    }

    /// The job for `user_id` if one exists. Never creates.
    pub fn get(&self, user_id: &str) -> Option<Arc<Job>> {
        self.jobs.get(user_id).map(|job| Arc::clone(job.value()))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Snapshots of every job currently running, keyed by user id.
    pub fn active_jobs(&self) -> Vec<(String, JobSnapshot)> {
        self.jobs
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .filter(|(_, snap)| snap.status == JobStatus::Running)
            .collect()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SimulatedExporter::default()))
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry").field("jobs", &self.jobs.len()).finish()
    }
}
