//! Route handlers for the hypercontacts server.

pub mod api;
pub mod archive;
pub mod contacts;
pub mod health;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Router;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header htmx sets to the id of the element that triggered a request.
pub const HX_TRIGGER: &str = "hx-trigger";

/// Create the combined router.
///
/// Routes:
/// - GET /api/health - Health check
/// - GET /, /contacts, /contacts/{id}, ... - HTML pages and htmx fragments
/// - POST|GET|DELETE /contacts/archive - Per-user archive job widget
/// - GET /contacts/archive/file - Download the finished archive
/// - GET /contacts/archive/stream - SSE stream of archive progress
/// - /api/v1/contacts, /api/v1/archive - JSON API
pub fn app_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(contacts::router())
        .merge(archive::router())
        .nest("/api", health::router())
        .nest("/api/v1", api::router())
        .with_state(state)
}

/// Parse a contact id from a path or query segment.
pub(crate) fn parse_id(raw: &str) -> ApiResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("id must be an integer, got '{raw}'")))
}

pub(crate) fn hx_trigger(headers: &HeaderMap) -> Option<&str> {
    headers.get(HX_TRIGGER).and_then(|v| v.to_str().ok())
}
