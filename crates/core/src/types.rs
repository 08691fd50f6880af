// crates/core/src/types.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of contacts shown per page.
pub const PAGE_SIZE: usize = 10;

/// Field name → human-readable validation message.
///
/// Ordered so rendered error lists and JSON bodies are stable.
pub type FieldErrors = BTreeMap<String, String>;

/// A stored contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    pub first: String,
    pub last: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

/// Contact fields as submitted by a form or JSON body, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl ContactDraft {
    /// Required-field checks that need no access to other contacts.
    ///
    /// Email is checked by the store, which knows about uniqueness.
    pub fn required_field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.first_name.is_empty() {
            errors.insert("first".into(), "First name is required".into());
        }
        if self.last_name.is_empty() {
            errors.insert("last".into(), "Last name is required".into());
        }
        if self.phone.is_empty() {
            errors.insert("phone".into(), "Phone is required".into());
        }
        errors
    }

    pub(crate) fn into_contact(self, id: u64) -> Contact {
        Contact {
            id,
            first: self.first_name,
            last: self.last_name,
            email: self.email,
            phone: self.phone,
        }
    }
}

impl From<&Contact> for ContactDraft {
    fn from(c: &Contact) -> Self {
        Self {
            first_name: c.first.clone(),
            last_name: c.last.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
        }
    }
}

/// Normalise a 1-based page number; anything below 1 means the first page.
pub fn normalize_page(page: i64) -> usize {
    if page <= 0 {
        1
    } else {
        page as usize
    }
}
