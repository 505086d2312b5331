//! Storage backends for brew entries.
//!
//! Every backend implements [`BrewStore`], the capability the
//! [`Journal`](crate::Journal) composes over:
//! - [`RemoteStore`]: HTTP document store addressed by table name
//! - [`LocalStore`]: a single JSON slot on this device
//! - [`MemoryStore`]: in-process store with failure injection, for tests

mod local;
mod memory;
mod remote;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use remote::{RemoteConfig, RemoteStore, REGION_HEADER};

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::StoreError;
use crate::models::{BrewEntry, BrewFields};

/// Which backend answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Remote,
    Local,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Remote => write!(f, "remote"),
            Backend::Local => write!(f, "local"),
        }
    }
}

/// Create/read/update/delete over a collection of brew entries.
#[async_trait]
pub trait BrewStore: Send + Sync {
    /// False when the store knows up front that every call will fail.
    fn is_configured(&self) -> bool {
        true
    }

    /// Assigns an id and both timestamps, persists, returns the stored entry.
    async fn create(&self, fields: BrewFields) -> Result<BrewEntry, StoreError>;

    /// Every stored entry. Order is backend-defined.
    async fn list(&self) -> Result<Vec<BrewEntry>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<BrewEntry>, StoreError>;

    /// Replaces the editable fields of an existing entry.
    ///
    /// Keeps `id` and `created_at`; refreshes `updated_at`. Fails with
    /// [`StoreError::NotFound`] when no entry has this id.
    async fn update(&self, id: &str, fields: BrewFields) -> Result<BrewEntry, StoreError>;

    /// Removes the entry; succeeds when it does not exist.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Verifies the backend is usable without touching stored entries.
    async fn check(&self) -> Result<(), StoreError>;
}
