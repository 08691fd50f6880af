// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use hypercontacts_core::ContactStore;
use hypercontacts_server_jobs::JobRegistry;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// The contact list all users share.
    pub contacts: Arc<ContactStore>,
    /// One archive job per user, created on first touch.
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(contacts: Arc<ContactStore>, jobs: Arc<JobRegistry>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            contacts,
            jobs,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
