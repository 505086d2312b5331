//! Error types shared by the storage backends and the journal.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every field of a brew that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {}", join_messages(.errors))]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

fn join_messages(errors: &[FieldError]) -> String {
    let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
    messages.join("; ")
}

/// Errors returned by a [`BrewStore`](crate::store::BrewStore) or the journal.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Remote backend is unconfigured or could not be reached.
    #[error("Remote backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Local storage medium cannot be read or written.
    #[error("Local storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No brew with this id.
    #[error("Brew not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    /// True for the only error the journal answers by falling back.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, StoreError::BackendUnavailable(_))
    }
}
