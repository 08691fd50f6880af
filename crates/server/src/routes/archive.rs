//! Archive routes for the hypermedia UI.
//!
//! - POST /contacts/archive         - start the caller's export
//! - GET /contacts/archive          - current widget
//! - DELETE /contacts/archive       - reset to idle
//! - GET /contacts/archive/file     - download the finished archive
//! - GET /contacts/archive/stream   - SSE stream of job snapshots

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use hypercontacts_server_jobs::{JobSnapshot, JobStatus, StartOutcome};
use tokio::sync::broadcast::error::RecvError;

use crate::error::{ApiError, ApiResult};
use crate::html;
use crate::state::AppState;
use crate::user::UserId;

/// File name offered to the browser for the download.
pub const ARCHIVE_DOWNLOAD_NAME: &str = "contacts.json";

async fn start_archive(State(state): State<Arc<AppState>>, user: UserId) -> Html<String> {
    let job = state.jobs.get_or_create(user.as_str());
    match job.start() {
        StartOutcome::Started => tracing::info!(user_id = %user, "Archive requested"),
        StartOutcome::AlreadyActive(status) => {
            tracing::debug!(user_id = %user, status = %status, "Archive already active")
        }
    }
    Html(html::archive_ui(&job.snapshot()))
}

async fn archive_status(State(state): State<Arc<AppState>>, user: UserId) -> Html<String> {
    let snapshot = state
        .jobs
        .get(user.as_str())
        .map(|job| job.snapshot())
        .unwrap_or_else(JobSnapshot::idle);
    Html(html::archive_ui(&snapshot))
}

async fn reset_archive(State(state): State<Arc<AppState>>, user: UserId) -> Html<String> {
    if let Some(job) = state.jobs.get(user.as_str()) {
        job.reset();
    }
    Html(html::archive_ui(&JobSnapshot::idle()))
}

async fn download_archive(State(state): State<Arc<AppState>>, user: UserId) -> ApiResult<Response> {
    let path = state
        .jobs
        .get(user.as_str())
        .and_then(|job| job.result())
        .ok_or(ApiError::ArchiveNotReady)?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::ArchiveFileMissing(path));
        }
        Err(e) => {
            return Err(ApiError::Internal(format!(
                "reading archive {}: {e}",
                path.display()
            )));
        }
    };

    tracing::info!(user_id = %user, bytes = bytes.len(), "Archive downloaded");
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{ARCHIVE_DOWNLOAD_NAME}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn snapshot_event(snapshot: &JobSnapshot) -> Event {
    let json = serde_json::to_string(snapshot).unwrap_or_default();
    Event::default().event("archive").data(json)
}

/// Sends the current snapshot, then every change until the run leaves
/// Running.
async fn stream_archive(
    State(state): State<Arc<AppState>>,
    user: UserId,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let job = state.jobs.get_or_create(user.as_str());
    let mut rx = job.subscribe();
    let initial = job.snapshot();

    let stream = async_stream::stream! {
        let mut last = initial;
        yield Ok(snapshot_event(&last));
        while last.status == JobStatus::Running {
            match rx.recv().await {
                Ok(snapshot) => last = snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(user_id = %job.user_id(), skipped, "Archive stream lagged");
                    last = job.snapshot();
                }
                Err(RecvError::Closed) => break,
            }
            yield Ok(snapshot_event(&last));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/contacts/archive",
            get(archive_status).post(start_archive).delete(reset_archive),
        )
        .route("/contacts/archive/file", get(download_archive))
        .route("/contacts/archive/stream", get(stream_archive))
}
