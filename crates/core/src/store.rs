// crates/core/src/store.rs
//! In-memory contact list.
//!
//! The list is loaded once at startup and then mutated in place. It is not
//! written back to disk; a single `RwLock` serialises writers, which is all the
//! consistency this store promises.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ContactError, StoreError};
use crate::types::{Contact, ContactDraft, FieldErrors, PAGE_SIZE};

pub const EMAIL_EMPTY: &str = "Email is empty";
pub const EMAIL_NOT_UNIQUE: &str = "Email must be unique";

#[derive(Debug, Default)]
pub struct ContactStore {
    contacts: RwLock<Vec<Contact>>,
}

impl ContactStore {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: RwLock::new(contacts),
        }
    }

    /// Load the bootstrap contact list from a JSON array on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let contacts: Vec<Contact> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::MalformedJson {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        tracing::info!(path = %path.display(), count = contacts.len(), "Loaded contacts");
        Ok(Self::new(contacts))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Contact>> {
        self.contacts.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading contacts: {e}");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Contact>> {
        self.contacts.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing contacts: {e}");
            e.into_inner()
        })
    }

    /// Contacts on a 1-based page of `PAGE_SIZE`. Out-of-range pages are empty.
    pub fn list_page(&self, page: usize) -> Vec<Contact> {
        let Some(start) = page.saturating_sub(1).checked_mul(PAGE_SIZE) else {
            return Vec::new();
        };
        self.read().iter().skip(start).take(PAGE_SIZE).cloned().collect()
    }

    pub fn all(&self) -> Vec<Contact> {
        self.read().clone()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn find(&self, id: u64) -> Option<Contact> {
        self.read().iter().find(|c| c.id == id).cloned()
    }

    /// Email validation message, or `None` when the address is usable.
    ///
    /// `exclude` is the id of the contact being edited, whose own address
    /// does not count as a duplicate.
    pub fn email_error(&self, exclude: Option<u64>, email: &str) -> Option<&'static str> {
        email_error_in(&self.read(), exclude, email)
    }

    /// All validation errors for a draft; empty when the draft is acceptable.
    pub fn validate(&self, draft: &ContactDraft, exclude: Option<u64>) -> FieldErrors {
        validate_in(&self.read(), draft, exclude)
    }

    /// Validate and append a new contact with the next free id.
    pub fn insert(&self, draft: ContactDraft) -> Result<Contact, ContactError> {
        let mut contacts = self.write();
        let errors = validate_in(&contacts, &draft, None);
        if !errors.is_empty() {
            return Err(ContactError::Invalid(errors));
        }
        let id = contacts.iter().map(|c| c.id).max().map_or(1, |max| max + 1);
        let contact = draft.into_contact(id);
        contacts.push(contact.clone());
        tracing::info!(contact_id = id, "Contact added");
        Ok(contact)
    }

    pub fn update(&self, id: u64, draft: ContactDraft) -> Result<Contact, ContactError> {
        let mut contacts = self.write();
        if !contacts.iter().any(|c| c.id == id) {
            return Err(ContactError::NotFound(id));
        }
        let errors = validate_in(&contacts, &draft, Some(id));
        if !errors.is_empty() {
            return Err(ContactError::Invalid(errors));
        }
        let slot = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ContactError::NotFound(id))?;
        *slot = draft.into_contact(id);
        tracing::info!(contact_id = id, "Contact edited");
        Ok(slot.clone())
    }

    pub fn delete(&self, id: u64) -> Result<Contact, ContactError> {
        let mut contacts = self.write();
        let idx = contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or(ContactError::NotFound(id))?;
        let removed = contacts.remove(idx);
        tracing::info!(contact_id = id, "Contact deleted");
        Ok(removed)
    }

    /// Remove every contact whose id is listed. Unknown ids are skipped.
    /// Returns how many contacts were removed.
    pub fn delete_many(&self, ids: &[u64]) -> usize {
        let mut contacts = self.write();
        let before = contacts.len();
        contacts.retain(|c| !ids.contains(&c.id));
        let removed = before - contacts.len();
        tracing::info!(requested = ids.len(), removed, "Contacts deleted");
        removed
    }
}

fn email_error_in(contacts: &[Contact], exclude: Option<u64>, email: &str) -> Option<&'static str> {
    if email.is_empty() {
        return Some(EMAIL_EMPTY);
    }
    contacts
        .iter()
        .any(|c| Some(c.id) != exclude && c.email == email)
        .then_some(EMAIL_NOT_UNIQUE)
}

fn validate_in(contacts: &[Contact], draft: &ContactDraft, exclude: Option<u64>) -> FieldErrors {
    let mut errors = draft.required_field_errors();
    if let Some(msg) = email_error_in(contacts, exclude, &draft.email) {
        errors.insert("email".into(), msg.into());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    use crate::types::normalize_page;

    fn contact(id: u64, email: &str) -> Contact {
        Contact {
            id,
            first: format!("First{id}"),
            last: format!("Last{id}"),
            email: email.to_string(),
            phone: "555-0100".to_string(),
        }
    }

    fn draft(email: &str) -> ContactDraft {
        ContactDraft {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            phone: "555-0199".into(),
        }
    }

    fn store_with(n: u64) -> ContactStore {
        ContactStore::new((1..=n).map(|i| contact(i, &format!("c{i}@example.com"))).collect())
    }

    #[test]
    fn test_list_page_boundaries() {
        let store = store_with(23);
        assert_eq!(store.list_page(1).len(), 10);
        assert_eq!(store.list_page(1)[0].id, 1);
        assert_eq!(store.list_page(3).len(), 3);
        assert_eq!(store.list_page(3)[0].id, 21);
        assert!(store.list_page(4).is_empty());
        // page 0 behaves like page 1
        assert_eq!(store.list_page(0), store.list_page(1));
    }

    #[test]
    fn test_list_page_huge_page_is_empty() {
        let store = store_with(23);
        assert!(store.list_page(normalize_page(1_844_674_407_370_955_163)).is_empty());
        assert!(store.list_page(usize::MAX).is_empty());
    }

    #[test]
    fn test_email_error() {
        let store = store_with(2);
        assert_eq!(store.email_error(None, ""), Some(EMAIL_EMPTY));
        assert_eq!(store.email_error(None, "c1@example.com"), Some(EMAIL_NOT_UNIQUE));
        assert_eq!(store.email_error(Some(1), "c1@example.com"), None);
        assert_eq!(store.email_error(None, "new@example.com"), None);
    }

    #[test]
    fn test_insert_assigns_next_id() {
        let store = store_with(3);
        let c = store.insert(draft("new@example.com")).unwrap();
        assert_eq!(c.id, 4);
        assert_eq!(store.count(), 4);
        assert_eq!(store.find(4).unwrap().email, "new@example.com");
    }

    #[test]
    fn test_insert_into_empty_store_starts_at_one() {
        let store = ContactStore::default();
        let c = store.insert(draft("first@example.com")).unwrap();
        assert_eq!(c.id, 1);
    }

    #[test]
    fn test_insert_rejects_duplicate_email() {
        let store = store_with(1);
        match store.insert(draft("c1@example.com")) {
            Err(ContactError::Invalid(errors)) => {
                assert_eq!(errors.get("email").map(String::as_str), Some(EMAIL_NOT_UNIQUE));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_update_keeps_own_email() {
        let store = store_with(2);
        let mut d = draft("c2@example.com");
        d.first_name = "Renamed".into();
        let updated = store.update(2, d).unwrap();
        assert_eq!(updated.first, "Renamed");
        assert_eq!(store.find(2).unwrap().first, "Renamed");
    }

    #[test]
    fn test_update_unknown_contact() {
        let store = store_with(1);
        assert!(matches!(
            store.update(99, draft("x@example.com")),
            Err(ContactError::NotFound(99))
        ));
    }

    #[test]
    fn test_delete_and_delete_many() {
        let store = store_with(5);
        assert_eq!(store.delete(3).unwrap().id, 3);
        assert!(matches!(store.delete(3), Err(ContactError::NotFound(3))));

        let removed = store.delete_many(&[1, 2, 42]);
        assert_eq!(removed, 2);
        let ids: Vec<u64> = store.all().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":1,"first":"A","last":"B","email":"a@b.c","phone":"1","errors":{{}}}}]"#
        )
        .unwrap();

        let store = ContactStore::load(file.path()).unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(store.find(1).unwrap().email, "a@b.c");
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(ContactStore::load(&missing), Err(StoreError::NotFound { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(ContactStore::load(&bad), Err(StoreError::MalformedJson { .. })));
    }
}
