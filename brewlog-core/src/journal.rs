//! The brew journal: one persistence API over a remote and a local store.
//!
//! Each call is tried against the remote store first. If the remote store
//! reports [`StoreError::BackendUnavailable`] the same call is made once
//! against the local store, and that answer is final. Nothing is remembered
//! between calls, so the next call tries the remote store again.
//!
//! The two stores are never reconciled: an entry created locally while the
//! remote store was down stays local.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{BrewEntry, BrewFields, BrewFilter};
use crate::store::{Backend, BrewStore, LocalStore, RemoteConfig, RemoteStore};

/// A result together with the backend that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    pub value: T,
    pub backend: Backend,
}

impl<T> Served<T> {
    pub fn new(value: T, backend: Backend) -> Self {
        Self { value, backend }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Served<U> {
        Served::new(f(self.value), self.backend)
    }

    pub fn is_fallback(&self) -> bool {
        self.backend == Backend::Local
    }
}

/// Where and under which name the journal keeps its data.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub remote: RemoteConfig,
}

/// Outcome of [`Journal::health`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub local_storage: bool,
    pub remote_configured: bool,
    pub remote_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
    pub version: &'static str,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// The journal works as long as the local store does.
    pub fn is_healthy(&self) -> bool {
        self.local_storage
    }
}

pub struct Journal {
    remote: Arc<dyn BrewStore>,
    local: Arc<dyn BrewStore>,
}

impl Journal {
    pub fn new(remote: Arc<dyn BrewStore>, local: Arc<dyn BrewStore>) -> Self {
        Self { remote, local }
    }

    /// Builds the remote and local stores from configuration.
    ///
    /// An incomplete remote section is accepted (every call then lands in the
    /// local store) unless `remote.required` is set.
    pub fn from_config(config: &JournalConfig) -> Result<Self, StoreError> {
        let missing = config.remote.missing();
        if !missing.is_empty() {
            if config.remote.required {
                return Err(StoreError::BackendUnavailable(format!(
                    "remote store is required but not configured (missing {})",
                    missing.join(", ")
                )));
            }
            tracing::info!("Remote store not configured; brews are kept on this device");
        }

        let remote = RemoteStore::new(&config.remote);
        let local = LocalStore::new(&config.data_dir, &config.storage_key);

        Ok(Self::new(Arc::new(remote), Arc::new(local)))
    }

    fn fall_back(operation: &str, err: &StoreError) {
        tracing::info!("Remote {} failed, using local storage: {}", operation, err);
    }

    /// Validates and stores a new brew.
    pub async fn create(&self, fields: BrewFields) -> Result<Served<BrewEntry>, StoreError> {
        fields.validate()?;

        match self.remote.create(fields.clone()).await {
            Err(e) if e.is_backend_unavailable() => {
                Self::fall_back("create", &e);
                let entry = self.local.create(fields).await?;
                Ok(Served::new(entry, Backend::Local))
            }
            result => result.map(|entry| Served::new(entry, Backend::Remote)),
        }
    }

    /// Every brew, newest first.
    pub async fn list(&self) -> Result<Served<Vec<BrewEntry>>, StoreError> {
        let served = match self.remote.list().await {
            Err(e) if e.is_backend_unavailable() => {
                Self::fall_back("list", &e);
                Served::new(self.local.list().await?, Backend::Local)
            }
            result => Served::new(result?, Backend::Remote),
        };

        Ok(served.map(newest_first))
    }

    /// Brews matching `filter`, newest first.
    pub async fn list_filtered(
        &self,
        filter: BrewFilter,
    ) -> Result<Served<Vec<BrewEntry>>, StoreError> {
        let served = self.list().await?;
        Ok(served.map(|entries| entries.into_iter().filter(|e| filter.matches(e)).collect()))
    }

    /// The brew with this id, or `NotFound`.
    pub async fn get(&self, id: &str) -> Result<Served<BrewEntry>, StoreError> {
        let served = match self.remote.get(id).await {
            Err(e) if e.is_backend_unavailable() => {
                Self::fall_back("get", &e);
                Served::new(self.local.get(id).await?, Backend::Local)
            }
            result => Served::new(result?, Backend::Remote),
        };

        match served.value {
            Some(entry) => Ok(Served::new(entry, served.backend)),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Validates and replaces the editable fields of an existing brew.
    pub async fn update(
        &self,
        id: &str,
        fields: BrewFields,
    ) -> Result<Served<BrewEntry>, StoreError> {
        fields.validate()?;

        match self.remote.update(id, fields.clone()).await {
            Err(e) if e.is_backend_unavailable() => {
                Self::fall_back("update", &e);
                let entry = self.local.update(id, fields).await?;
                Ok(Served::new(entry, Backend::Local))
            }
            result => result.map(|entry| Served::new(entry, Backend::Remote)),
        }
    }

    /// Removes a brew. Removing an unknown id succeeds.
    pub async fn delete(&self, id: &str) -> Result<Served<()>, StoreError> {
        match self.remote.delete(id).await {
            Err(e) if e.is_backend_unavailable() => {
                Self::fall_back("delete", &e);
                self.local.delete(id).await?;
                Ok(Served::new((), Backend::Local))
            }
            result => result.map(|()| Served::new((), Backend::Remote)),
        }
    }

    /// Probes both stores without touching stored brews.
    pub async fn health(&self) -> HealthReport {
        let local_storage = match self.local.check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Local storage check failed: {}", e);
                false
            }
        };

        let remote_configured = self.remote.is_configured();
        let remote_error = if remote_configured {
            self.remote.check().await.err().map(|e| e.to_string())
        } else {
            None
        };

        HealthReport {
            local_storage,
            remote_configured,
            remote_reachable: remote_configured && remote_error.is_none(),
            remote_error,
            version: crate::version(),
            checked_at: Utc::now(),
        }
    }
}

/// Sorts by `created_at`, newest first. Entries created at the same instant
/// keep their stored order.
fn newest_first(mut entries: Vec<BrewEntry>) -> Vec<BrewEntry> {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries
}
