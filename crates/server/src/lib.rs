// crates/server/src/lib.rs
//! Hypercontacts server library.
//!
//! An Axum server for a shared contact list: HTML pages and htmx fragments,
//! a JSON API, and a per-user background archive export.

pub mod config;
pub mod error;
pub mod export;
pub mod html;
pub mod routes;
pub mod state;
pub mod user;

pub use config::Config;
pub use error::*;
pub use export::ContactsArchiveExporter;
pub use routes::app_routes;
pub use state::AppState;
pub use user::{UserId, USER_COOKIE};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use hypercontacts_observability::with_request_tracing;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

/// Request timeout used by [`create_app`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the Axum application without static files.
pub fn create_app(state: Arc<AppState>) -> Router {
    create_app_full(state, None, DEFAULT_REQUEST_TIMEOUT)
}

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - Hypermedia, archive and JSON API routes
/// - `/static` from `static_dir`, when given
/// - The user-id cookie
/// - Request timeout, compression and permissive CORS
/// - Request ids and tracing spans
pub fn create_app_full(
    state: Arc<AppState>,
    static_dir: Option<PathBuf>,
    request_timeout: Duration,
) -> Router {
    let mut app = app_routes(state);
    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "Serving static files");
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    with_middleware(app, request_timeout)
}

/// Wrap `app` in the cookie, timeout, compression, CORS and tracing layers.
fn with_middleware(app: Router, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = app
        .layer(axum::middleware::from_fn(user::ensure_user_id))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CompressionLayer::new())
        .layer(cors);

    with_request_tracing(app)
}

// ============================================================================
// Integration Tests
// ============================================================================
