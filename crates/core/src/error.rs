// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::types::FieldErrors;

/// Errors that can occur when loading the contact list at startup
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Contacts file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in contacts file {path}: {message}")]
    MalformedJson { path: PathBuf, message: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors returned by contact mutations
#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Contact not found: {0}")]
    NotFound(u64),

    #[error("Contact has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),
}
