//! Archive exporter that writes the contact list to disk.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use hypercontacts_core::ContactStore;
use hypercontacts_server_jobs::{ArchiveExporter, ExportError, ProgressReporter, StepSchedule};

/// Walks a [`StepSchedule`] for progress, then writes every contact as
/// pretty JSON to `<dir>/contacts-<user>.json`.
#[derive(Debug)]
pub struct ContactsArchiveExporter {
    contacts: Arc<ContactStore>,
    dir: PathBuf,
    schedule: StepSchedule,
}

impl ContactsArchiveExporter {
    pub fn new(contacts: Arc<ContactStore>, dir: impl Into<PathBuf>, schedule: StepSchedule) -> Self {
        Self {
            contacts,
            dir: dir.into(),
            schedule,
        }
    }

    /// Archive file for `user_id`. Characters outside `[A-Za-z0-9-]` become `_`.
    pub fn archive_path(&self, user_id: &str) -> PathBuf {
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("contacts-{safe}.json"))
    }
}

#[async_trait]
impl ArchiveExporter for ContactsArchiveExporter {
    async fn export(
        &self,
        user_id: &str,
        progress: &ProgressReporter,
    ) -> Result<PathBuf, ExportError> {
        self.schedule.run(progress).await?;
        if progress.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let contacts = self.contacts.all();
        let json = serde_json::to_vec_pretty(&contacts)
            .map_err(|e| ExportError::Failed(format!("serialize contacts: {e}")))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ExportError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.archive_path(user_id);
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            user_id,
            path = %path.display(),
            count = contacts.len(),
            "Archive written"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypercontacts_core::Contact;
    use hypercontacts_server_jobs::{Job, JobStatus};
    use std::time::Duration;

    fn store() -> Arc<ContactStore> {
        Arc::new(ContactStore::new(vec![Contact {
            id: 1,
            first: "Ada".into(),
            last: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
        }]))
    }

    #[test]
    fn test_archive_path_sanitizes_user() {
        let exporter = ContactsArchiveExporter::new(store(), "/tmp/a", StepSchedule::default());
        assert_eq!(
            exporter.archive_path("../../etc/passwd"),
            PathBuf::from("/tmp/a/contacts-______etc_passwd.json")
        );
        assert_eq!(
            exporter.archive_path("0b5c-11"),
            PathBuf::from("/tmp/a/contacts-0b5c-11.json")
        );
    }

    #[tokio::test]
    async fn test_export_writes_contacts() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Arc::new(ContactsArchiveExporter::new(
            store(),
            dir.path().join("archives"),
            StepSchedule::new(2, Duration::from_millis(1)),
        ));
        let job = Arc::new(Job::new("user-1", exporter));

        assert!(job.start().is_started());
        for _ in 0..200 {
            if job.status() != JobStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(job.status(), JobStatus::Done);
        let path = job.result().unwrap();
        assert_eq!(path, dir.path().join("archives").join("contacts-user-1.json"));
        let written: Vec<Contact> = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_unwritable_dir_fails_job() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot hold the archive directory.
        let exporter = Arc::new(ContactsArchiveExporter::new(
            store(),
            file.path().join("nested"),
            StepSchedule::new(0, Duration::from_millis(1)),
        ));
        let job = Arc::new(Job::new("user-2", exporter));

        job.start();
        for _ in 0..200 {
            if job.status() != JobStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let snapshot = job.snapshot();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert!(snapshot.error.unwrap().contains("IO error"));
    }

    #[tokio::test]
    async fn test_reset_before_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Arc::new(ContactsArchiveExporter::new(
            store(),
            dir.path(),
            StepSchedule::new(50, Duration::from_millis(10)),
        ));
        let job = Arc::new(Job::new("user-3", exporter.clone()));

        job.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        job.reset();
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert_eq!(job.status(), JobStatus::Idle);
        assert!(!exporter.archive_path("user-3").exists());
    }
}
