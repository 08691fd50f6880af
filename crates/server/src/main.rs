// crates/server/src/main.rs
//! Hypercontacts server binary.
//!
//! Loads the contact list, wires the archive job registry to the on-disk
//! exporter and serves until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hypercontacts_core::ContactStore;
use hypercontacts_observability::init_tracing;
use hypercontacts_server::{create_app_full, AppState, Config, ContactsArchiveExporter};
use hypercontacts_server_jobs::JobRegistry;

/// Resolve when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format)?;

    // A missing or broken contacts file is not fatal: start with an empty list.
    let contacts = match ContactStore::load(&config.contacts) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Could not load contacts, starting empty");
            ContactStore::default()
        }
    };
    let contacts = Arc::new(contacts);

    let archive_dir = config.archive_dir();
    let exporter = ContactsArchiveExporter::new(
        Arc::clone(&contacts),
        archive_dir.clone(),
        config.archive_schedule(),
    );
    let jobs = Arc::new(JobRegistry::new(Arc::new(exporter)));

    let state = AppState::new(contacts, jobs);
    let app = create_app_full(state, config.static_dir(), config.request_timeout());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        archive_dir = %archive_dir.display(),
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
