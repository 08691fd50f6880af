//! Hypermedia contact routes: full pages plus the fragments htmx swaps in.
//!
//! - GET /                     → redirect to /contacts
//! - GET /contacts             → list, search by id, paging
//! - GET|POST /contacts/new    → add form
//! - GET /contacts/{id}        → detail page
//! - GET|POST /contacts/{id}/edit
//! - DELETE /contacts/{id}     → delete one
//! - DELETE /contacts          → delete the checked rows
//! - GET /contacts/count       → "N total Contacts"
//! - GET /contacts/{id}/email, GET /contacts/new/email → inline email check

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use hypercontacts_core::{normalize_page, ContactDraft, ContactError, FieldErrors};
use hypercontacts_server_jobs::JobSnapshot;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::html;
use crate::routes::{hx_trigger, parse_id};
use crate::state::AppState;
use crate::user::UserId;

/// Form field carrying the ids checked in the contact table.
pub const SELECTED_IDS_FIELD: &str = "selected_contact_ids";

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
    /// Kept as text so a malformed page falls back to the first page.
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: String,
}

fn archive_snapshot(state: &AppState, user: &UserId) -> JobSnapshot {
    state
        .jobs
        .get(user.as_str())
        .map(|job| job.snapshot())
        .unwrap_or_else(JobSnapshot::idle)
}

async fn redirect_root() -> Redirect {
    Redirect::to("/contacts")
}

/// GET /contacts?q=<id>&page=<n>
///
/// `HX-Trigger: search` asks for the table rows only.
async fn list_contacts(
    State(state): State<Arc<AppState>>,
    user: UserId,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Html<String>> {
    let rows_only = hx_trigger(&headers) == Some("search");
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();

    let (contacts, next_page) = if q.is_empty() {
        let page = normalize_page(
            query
                .page
                .as_deref()
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(1),
        );
        (state.contacts.list_page(page), page.checked_add(1))
    } else {
        let id = parse_id(q)?;
        let contact = state.contacts.find(id).ok_or(ApiError::ContactNotFound(id))?;
        (vec![contact], None)
    };

    if rows_only {
        return Ok(Html(html::contact_rows(&contacts, next_page)));
    }
    Ok(Html(html::index_page(
        &contacts,
        q,
        next_page,
        &archive_snapshot(&state, &user),
    )))
}

async fn new_contact_form() -> Html<String> {
    Html(html::contact_form(None, &ContactDraft::default(), &FieldErrors::new()))
}

/// POST /contacts/new. Invalid input re-renders the form with messages.
async fn create_contact(
    State(state): State<Arc<AppState>>,
    Form(draft): Form<ContactDraft>,
) -> ApiResult<Html<String>> {
    match state.contacts.insert(draft.clone()) {
        Ok(contact) => Ok(Html(html::success_fragment(&format!(
            "Contact {} added successfully",
            contact.full_name()
        )))),
        Err(ContactError::Invalid(errors)) => Ok(Html(html::contact_form(None, &draft, &errors))),
        Err(e) => Err(e.into()),
    }
}

async fn show_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let id = parse_id(&id)?;
    let contact = state.contacts.find(id).ok_or(ApiError::ContactNotFound(id))?;
    Ok(Html(html::contact_detail(&contact)))
}

async fn edit_contact_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let id = parse_id(&id)?;
    let contact = state.contacts.find(id).ok_or(ApiError::ContactNotFound(id))?;
    Ok(Html(html::contact_form(
        Some(id),
        &ContactDraft::from(&contact),
        &FieldErrors::new(),
    )))
}

async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(draft): Form<ContactDraft>,
) -> ApiResult<Html<String>> {
    let id = parse_id(&id)?;
    match state.contacts.update(id, draft.clone()) {
        Ok(contact) => Ok(Html(html::success_fragment(&format!(
            "Contact {} edited successfully",
            contact.full_name()
        )))),
        Err(ContactError::Invalid(errors)) => Ok(Html(html::contact_form(Some(id), &draft, &errors))),
        Err(e) => Err(e.into()),
    }
}

/// DELETE /contacts/{id}
///
/// The edit page's delete button gets a confirmation; a table row's inline
/// delete gets an empty body so the row disappears.
async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let contact = state.contacts.delete(id)?;
    if hx_trigger(&headers) == Some("delete-btn") {
        let message = format!("Contact {} deleted successfully", contact.full_name());
        return Ok(Html(html::success_fragment(&message)).into_response());
    }
    Ok(Html(String::new()).into_response())
}

/// Collect `selected_contact_ids` from the query string and the form body.
/// htmx sends DELETE parameters in the query string; plain forms use the body.
fn selected_ids(query: Option<&str>, body: &[u8]) -> ApiResult<Vec<u64>> {
    let from_query = query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect::<Vec<_>>())
        .unwrap_or_default();
    let from_body = url::form_urlencoded::parse(body).into_owned();

    from_query
        .into_iter()
        .chain(from_body)
        .filter(|(key, _)| key == SELECTED_IDS_FIELD)
        .map(|(_, value)| parse_id(&value))
        .collect()
}

/// DELETE /contacts. Renders the first page afterwards.
async fn delete_selected_contacts(
    State(state): State<Arc<AppState>>,
    user: UserId,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> ApiResult<Html<String>> {
    let ids = selected_ids(query.as_deref(), &body)?;
    state.contacts.delete_many(&ids);
    Ok(Html(html::index_page(
        &state.contacts.list_page(1),
        "",
        Some(2),
        &archive_snapshot(&state, &user),
    )))
}

async fn count_contacts(State(state): State<Arc<AppState>>) -> String {
    format!("{} total Contacts", state.contacts.count())
}

/// GET /contacts/{id}/email?email=
async fn validate_contact_email(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Html<String>> {
    let id = parse_id(&id)?;
    if state.contacts.find(id).is_none() {
        return Err(ApiError::ContactNotFound(id));
    }
    let error = state.contacts.email_error(Some(id), &query.email);
    Ok(Html(html::email_error_fragment(error)))
}

/// GET /contacts/new/email?email=
async fn validate_new_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> Html<String> {
    Html(html::email_error_fragment(
        state.contacts.email_error(None, &query.email),
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(redirect_root))
        .route("/contacts", get(list_contacts).delete(delete_selected_contacts))
        .route("/contacts/new", get(new_contact_form).post(create_contact))
        .route("/contacts/new/email", get(validate_new_email))
        .route("/contacts/count", get(count_contacts))
        .route("/contacts/{id}", get(show_contact).delete(delete_contact))
        .route("/contacts/{id}/edit", get(edit_contact_form).post(update_contact))
        .route("/contacts/{id}/email", get(validate_contact_email))
}
