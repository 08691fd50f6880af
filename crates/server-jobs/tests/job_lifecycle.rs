use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hypercontacts_server_jobs::{
    JobRegistry, JobSnapshot, JobStatus, SimulatedExporter, StartOutcome, StepSchedule,
    SIMULATED_ARCHIVE_PATH,
};
use pretty_assertions::assert_eq;

fn full_run() -> Duration {
    StepSchedule::default().duration() + Duration::from_millis(200)
}

#[tokio::test(start_paused = true)]
async fn start_then_wait_yields_done_with_result() {
    let registry = JobRegistry::default();
    let job = registry.get_or_create("u1");

    assert_eq!(job.start(), StartOutcome::Started);
    assert!(job.result().is_none(), "no result before completion");

    tokio::time::sleep(full_run()).await;

    let snap = job.snapshot();
    assert_eq!(snap.status, JobStatus::Done);
    assert_eq!(snap.progress, 1.0);
    assert!(snap.result_available);
    assert_eq!(job.result(), Some(PathBuf::from(SIMULATED_ARCHIVE_PATH)));
}

#[tokio::test(start_paused = true)]
async fn progress_never_decreases_while_running() {
    let registry = JobRegistry::default();
    let job = registry.get_or_create("u1");
    job.start();

    let mut last = 0.0_f64;
    let mut observed = 0;
    loop {
        let snap = job.snapshot();
        assert!((0.0..=1.0).contains(&snap.progress));
        assert!(snap.progress >= last, "progress went from {last} to {}", snap.progress);
        last = snap.progress;
        observed += 1;
        if snap.status == JobStatus::Done {
            break;
        }
        assert_eq!(snap.status, JobStatus::Running);
        assert!(!snap.result_available, "result visible before Done");
        tokio::time::sleep(Duration::from_millis(7)).await;
    }
    assert!(observed > 100);
    assert_eq!(last, 1.0);
}

#[tokio::test(start_paused = true)]
async fn rapid_double_start_schedules_one_worker() {
    let registry = JobRegistry::default();
    let job = registry.get_or_create("u1");

    assert!(job.start().is_started());
    assert_eq!(job.start(), StartOutcome::AlreadyActive(JobStatus::Running));

    tokio::time::sleep(full_run()).await;
    assert_eq!(job.launches(), 1);
    assert_eq!(job.status(), JobStatus::Done);

    // Done is terminal until reset.
    assert_eq!(job.start(), StartOutcome::AlreadyActive(JobStatus::Done));
    assert_eq!(job.launches(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_schedule_one_worker() {
    let exporter = SimulatedExporter::new(StepSchedule::new(10, Duration::from_millis(2)), "/tmp/out.zip");
    let registry = Arc::new(JobRegistry::new(Arc::new(exporter)));
    let barrier = Arc::new(tokio::sync::Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                registry.get_or_create("shared").start()
            })
        })
        .collect();

    let mut started = 0;
    for h in handles {
        if h.await.unwrap().is_started() {
            started += 1;
        }
    }
    assert_eq!(started, 1);

    let job = registry.get_or_create("shared");
    tokio::time::timeout(Duration::from_secs(5), async {
        while job.status() != JobStatus::Done {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not finish");

    assert_eq!(job.launches(), 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_clears_state_from_every_status() {
    let registry = JobRegistry::default();
    let job = registry.get_or_create("u1");

    // Idle
    job.reset();
    assert_eq!(job.snapshot(), JobSnapshot::idle());

    // Running
    job.start();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(job.status(), JobStatus::Running);
    job.reset();
    assert_eq!(job.snapshot(), JobSnapshot::idle());

    // Done
    job.start();
    tokio::time::sleep(full_run()).await;
    assert_eq!(job.status(), JobStatus::Done);
    job.reset();
    assert_eq!(job.snapshot(), JobSnapshot::idle());
    assert!(job.result().is_none());
}

#[tokio::test(start_paused = true)]
async fn abandoned_worker_never_overwrites_reset() {
    let registry = JobRegistry::default();
    let job = registry.get_or_create("u1");

    job.start();
    tokio::time::sleep(Duration::from_millis(2000)).await;
    job.reset();

    // Well past the point the first run would have finished.
    tokio::time::sleep(full_run() * 2).await;
    assert_eq!(job.snapshot(), JobSnapshot::idle());
    assert_eq!(job.launches(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_after_reset_runs_fresh() {
    let registry = JobRegistry::default();
    let job = registry.get_or_create("u1");

    job.start();
    tokio::time::sleep(Duration::from_millis(3000)).await;
    job.reset();
    assert!(job.start().is_started());

    // The new run starts from zero, not from the abandoned run's progress.
    assert_eq!(job.snapshot().progress, 0.0);
    tokio::time::sleep(full_run()).await;
    assert_eq!(job.status(), JobStatus::Done);
    assert_eq!(job.launches(), 2);
}

#[tokio::test(start_paused = true)]
async fn users_are_isolated() {
    let registry = JobRegistry::default();
    let a = registry.get_or_create("A");
    let b = registry.get_or_create("B");

    a.start();
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(a.status(), JobStatus::Running);
    assert_eq!(b.snapshot(), JobSnapshot::idle());
    assert_eq!(b.launches(), 0);

    a.reset();
    b.start();
    assert_eq!(a.status(), JobStatus::Idle);
    assert_eq!(b.status(), JobStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn mutation_through_one_handle_is_visible_through_another() {
    let registry = JobRegistry::default();
    let first = registry.get_or_create("X");
    let second = registry.get_or_create("X");

    first.start();
    assert_eq!(second.status(), JobStatus::Running);
    second.reset();
    assert_eq!(first.status(), JobStatus::Idle);
}
