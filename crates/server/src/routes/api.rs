//! JSON API, nested under `/api/v1`.
//!
//! Contact bodies may be JSON or form-encoded; responses are always JSON.
//!
//! - GET /contacts, POST /contacts
//! - GET|PUT|DELETE /contacts/{id}
//! - GET|POST|DELETE /archive

use std::sync::Arc;

use axum::extract::{FromRequest, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use hypercontacts_core::{Contact, ContactDraft, ContactError};
use hypercontacts_server_jobs::{JobSnapshot, StartOutcome};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::routes::parse_id;
use crate::state::AppState;
use crate::user::UserId;

/// Confirmation body for mutations.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

impl MessageResponse {
    fn new(message: impl Into<String>, contact: Option<Contact>) -> Self {
        Self {
            message: message.into(),
            contact,
        }
    }
}

/// Contact fields from either a JSON or a form-encoded body.
pub struct DraftBody(pub ContactDraft);

impl<S> FromRequest<S> for DraftBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(draft) = Form::<ContactDraft>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(draft))
        } else {
            let Json(draft) = Json::<ContactDraft>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(draft))
        }
    }
}

fn invalid_as(message: &str) -> impl FnOnce(ContactError) -> ApiError + '_ {
    move |err| match err {
        ContactError::Invalid(errors) => ApiError::Validation {
            message: message.to_string(),
            errors,
        },
        other => other.into(),
    }
}

async fn list_contacts(State(state): State<Arc<AppState>>) -> Json<Vec<Contact>> {
    Json(state.contacts.all())
}

async fn create_contact(
    State(state): State<Arc<AppState>>,
    DraftBody(draft): DraftBody,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let contact = state
        .contacts
        .insert(draft)
        .map_err(invalid_as("Could not add contact due to incorrect format"))?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Contact added successfully", Some(contact))),
    ))
}

async fn get_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Contact>> {
    let id = parse_id(&id)?;
    state
        .contacts
        .find(id)
        .map(Json)
        .ok_or(ApiError::ContactNotFound(id))
}

async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    DraftBody(draft): DraftBody,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    let contact = state
        .contacts
        .update(id, draft)
        .map_err(invalid_as("Could not edit contact due to incorrect format"))?;
    Ok(Json(MessageResponse::new("Contact edited successfully", Some(contact))))
}

async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    state.contacts.delete(id)?;
    Ok(Json(MessageResponse::new("Contact deleted successfully", None)))
}

async fn archive_snapshot(State(state): State<Arc<AppState>>, user: UserId) -> Json<JobSnapshot> {
    Json(
        state
            .jobs
            .get(user.as_str())
            .map(|job| job.snapshot())
            .unwrap_or_else(JobSnapshot::idle),
    )
}

/// 202 when a run was scheduled, 200 when the job was already past Idle.
async fn start_archive(
    State(state): State<Arc<AppState>>,
    user: UserId,
) -> (StatusCode, Json<JobSnapshot>) {
    let job = state.jobs.get_or_create(user.as_str());
    let status = match job.start() {
        StartOutcome::Started => StatusCode::ACCEPTED,
        StartOutcome::AlreadyActive(_) => StatusCode::OK,
    };
    (status, Json(job.snapshot()))
}

async fn reset_archive(State(state): State<Arc<AppState>>, user: UserId) -> Json<JobSnapshot> {
    if let Some(job) = state.jobs.get(user.as_str()) {
        job.reset();
    }
    Json(JobSnapshot::idle())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route(
            "/contacts/{id}",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route(
            "/archive",
            get(archive_snapshot).post(start_archive).delete(reset_archive),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypercontacts_core::FieldErrors;

    #[test]
    fn test_invalid_as_rewrites_message() {
        let mut errors = FieldErrors::new();
        errors.insert("phone".into(), "Phone is required".into());
        let err = invalid_as("Could not add contact")(ContactError::Invalid(errors));
        match err {
            ApiError::Validation { message, errors } => {
                assert_eq!(message, "Could not add contact");
                assert_eq!(errors["phone"], "Phone is required");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_as_keeps_not_found() {
        let err = invalid_as("x")(ContactError::NotFound(9));
        assert!(matches!(err, ApiError::ContactNotFound(9)));
    }

    #[test]
    fn test_message_response_skips_missing_contact() {
        let json = serde_json::to_string(&MessageResponse::new("done", None)).unwrap();
        assert_eq!(json, r#"{"message":"done"}"#);
    }
}
