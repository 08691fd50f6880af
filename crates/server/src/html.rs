//! HTML pages and htmx fragments.
//!
//! Markup is built with `format!`; every user-supplied value goes through
//! [`escape`] first.

use std::fmt::Write as _;

use hypercontacts_core::{Contact, ContactDraft, FieldErrors, PAGE_SIZE};
use hypercontacts_server_jobs::{JobSnapshot, JobStatus};

/// Escape text for use in element content and quoted attribute values.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full document around `body`.
pub fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <script src="https://unpkg.com/htmx.org@2.0.4"></script>
</head>
<body hx-boost="true">
  <main>
    <header><h1><a href="/contacts">Contacts</a></h1></header>
{body}
  </main>
</body>
</html>
"#,
        title = escape(title),
    )
}

/// The contact list page.
///
/// `query` is echoed into the search box. `next_page` adds a "Load More" row
/// when the page came back full.
pub fn index_page(contacts: &[Contact], query: &str, next_page: Option<usize>, archive: &JobSnapshot) -> String {
    let body = format!(
        r##"    {archive}
    <form action="/contacts" method="get" class="tool-bar">
      <label for="search">Search Term</label>
      <input id="search" type="search" name="q" value="{query}"
             hx-get="/contacts" hx-trigger="search, keyup delay:200ms changed"
             hx-target="tbody" hx-push-url="true" hx-indicator="#spinner">
      <img id="spinner" class="htmx-indicator" src="/static/img/spinning-circles.svg" alt="Searching">
      <input type="submit" value="Search">
    </form>
    <form>
      <table>
        <thead>
          <tr><th></th><th>First</th><th>Last</th><th>Phone</th><th>Email</th><th></th></tr>
        </thead>
        <tbody>
{rows}        </tbody>
      </table>
      <button hx-delete="/contacts" hx-confirm="Are you sure you want to delete these contacts?" hx-target="body">
        Delete Selected Contacts
      </button>
    </form>
    <p>
      <a href="/contacts/new">Add Contact</a>
      <span hx-get="/contacts/count" hx-trigger="revealed">
        <img class="htmx-indicator" src="/static/img/spinning-circles.svg" alt="Loading">
      </span>
    </p>
"##,
        archive = archive_ui(archive),
        query = escape(query),
        rows = contact_rows(contacts, next_page),
    );
    layout("Contacts", &body)
}

/// Table rows for `contacts`, plus a "Load More" row when `next_page` is set.
pub fn contact_rows(contacts: &[Contact], next_page: Option<usize>) -> String {
    let mut out = String::new();
    for c in contacts {
        let _ = writeln!(
            out,
            r##"          <tr>
            <td><input type="checkbox" name="selected_contact_ids" value="{id}"></td>
            <td>{first}</td>
            <td>{last}</td>
            <td>{phone}</td>
            <td>{email}</td>
            <td>
              <a href="/contacts/{id}/edit">Edit</a>
              <a href="/contacts/{id}">View</a>
              <a href="#" hx-delete="/contacts/{id}" hx-swap="outerHTML swap:1s"
                 hx-confirm="Are you sure you want to delete this contact?" hx-target="closest tr">Delete</a>
            </td>
          </tr>"##,
            id = c.id,
            first = escape(&c.first),
            last = escape(&c.last),
            phone = escape(&c.phone),
            email = escape(&c.email),
        );
    }
    if let Some(page) = next_page.filter(|_| contacts.len() == PAGE_SIZE) {
        let _ = writeln!(
            out,
            r#"          <tr>
            <td colspan="6" style="text-align: center">
              <button hx-target="closest tr" hx-swap="outerHTML" hx-select="tbody > tr"
                      hx-get="/contacts?page={page}">Load More</button>
            </td>
          </tr>"#
        );
    }
    out
}

pub fn contact_detail(contact: &Contact) -> String {
    let body = format!(
        r#"    <h2>{name}</h2>
    <div>
      <div>Phone: {phone}</div>
      <div>Email: {email}</div>
    </div>
    <p>
      <a href="/contacts/{id}/edit">Edit</a>
      <a href="/contacts">Back</a>
    </p>
"#,
        name = escape(&contact.full_name()),
        phone = escape(&contact.phone),
        email = escape(&contact.email),
        id = contact.id,
    );
    layout(&contact.full_name(), &body)
}

fn field(name: &str, label: &str, kind: &str, value: &str, error: Option<&String>, extra: &str) -> String {
    format!(
        r#"        <p>
          <label for="{name}">{label}</label>
          <input name="{name}" id="{name}" type="{kind}" placeholder="{label}" value="{value}"{extra}>
          <span class="error">{error}</span>
        </p>
"#,
        value = escape(value),
        error = error.map(|e| escape(e)).unwrap_or_default(),
    )
}

/// New-contact form (`id` is `None`) or edit form, with any field errors.
pub fn contact_form(id: Option<u64>, draft: &ContactDraft, errors: &FieldErrors) -> String {
    let (action, title, email_check) = match id {
        Some(id) => (
            format!("/contacts/{id}/edit"),
            "Edit Contact",
            format!("/contacts/{id}/email"),
        ),
        None => (
            "/contacts/new".to_string(),
            "New Contact",
            "/contacts/new/email".to_string(),
        ),
    };
    let email_attrs = format!(
        r#" hx-get="{email_check}" hx-target="next .error" hx-trigger="change, keyup delay:200ms changed""#
    );

    let mut fields = String::new();
    fields.push_str(&field("email", "Email", "email", &draft.email, errors.get("email"), &email_attrs));
    fields.push_str(&field("first_name", "First Name", "text", &draft.first_name, errors.get("first"), ""));
    fields.push_str(&field("last_name", "Last Name", "text", &draft.last_name, errors.get("last"), ""));
    fields.push_str(&field("phone", "Phone", "text", &draft.phone, errors.get("phone"), ""));

    let delete = id
        .map(|id| {
            format!(
                r#"    <button id="delete-btn" hx-delete="/contacts/{id}" hx-push-url="true"
            hx-confirm="Are you sure you want to delete this contact?" hx-target="body">Delete Contact</button>
"#
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"    <form action="{action}" method="post">
      <fieldset>
        <legend>Contact Values</legend>
{fields}        <button>Save</button>
      </fieldset>
    </form>
{delete}    <p><a href="/contacts">Back</a></p>
"#
    );
    layout(title, &body)
}

/// Confirmation shown after a successful add, edit or delete.
pub fn success_fragment(message: &str) -> String {
    format!(
        r#"<div class="success" role="status">
  <p>{message}</p>
  <a href="/contacts">Back to contacts</a>
</div>
"#,
        message = escape(message),
    )
}

/// Inline email-field error; empty when the address is acceptable.
pub fn email_error_fragment(error: Option<&str>) -> String {
    error.map(escape).unwrap_or_default()
}

/// The archive widget. It replaces itself on every interaction and polls
/// while an export is running.
pub fn archive_ui(snapshot: &JobSnapshot) -> String {
    let inner = match snapshot.status {
        JobStatus::Idle => {
            r#"<button hx-post="/contacts/archive">Download Contact Archive</button>"#.to_string()
        }
        JobStatus::Running => {
            let percent = snapshot.percent();
            format!(
                r#"<div hx-get="/contacts/archive" hx-trigger="load delay:500ms">
    Creating Archive...
    <div class="progress">
      <div id="archive-progress" class="progress-bar" role="progressbar"
           aria-valuenow="{percent:.0}" style="width:{percent:.1}%"></div>
    </div>
  </div>"#
            )
        }
        JobStatus::Done => r#"<a hx-boost="false" href="/contacts/archive/file">Archive Ready! Click here to download.</a>
  <button hx-delete="/contacts/archive">Clear Download</button>"#
            .to_string(),
        JobStatus::Failed => format!(
            r#"<p class="error">Archive failed: {error}</p>
  <button hx-delete="/contacts/archive">Clear</button>"#,
            error = escape(snapshot.error.as_deref().unwrap_or("unknown error")),
        ),
    };
    format!(
        r#"<div id="archive-ui" hx-target="this" hx-swap="outerHTML" data-status="{status}">
  {inner}
</div>"#,
        status = snapshot.status,
    )
}
