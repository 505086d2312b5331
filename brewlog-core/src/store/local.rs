//! Device-local brew storage.
//!
//! The whole collection lives in one JSON file, the storage slot:
//! ```text
//! <data_dir>/
//!   <storage_key>.json    [newest, ..., oldest]
//! ```
//!
//! Every write replaces the slot atomically (temp file + rename). The
//! writability probe uses `.<storage_key>.probe`, which no slot name can
//! collide with since storage keys may not start with a dot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::BrewStore;
use crate::error::StoreError;
use crate::models::{BrewEntry, BrewFields};

/// Synchronous storage of the full brew collection under one key.
#[derive(Debug, Clone)]
pub struct LocalStore {
    data_dir: PathBuf,
    storage_key: String,
}

impl LocalStore {
    pub fn new(data_dir: impl Into<PathBuf>, storage_key: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            storage_key: storage_key.into(),
        }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Full path of the storage slot.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.storage_key))
    }

    fn probe_path(&self) -> PathBuf {
        self.data_dir.join(format!(".{}.probe", self.storage_key))
    }

    /// Rejects storage keys that would resolve outside `data_dir`.
    fn validate_storage_key(&self) -> Result<(), StoreError> {
        let key = &self.storage_key;
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
            || key.starts_with('.')
        {
            return Err(StoreError::storage(
                self.data_dir.clone(),
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid storage key: {:?}", key),
                ),
            ));
        }
        Ok(())
    }

    /// Loads the stored collection.
    ///
    /// A missing slot and a payload that does not decode both yield an empty
    /// collection. Other I/O failures are `StorageUnavailable`.
    pub fn get_all(&self) -> Result<Vec<BrewEntry>, StoreError> {
        self.validate_storage_key()?;
        let path = self.path();

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::storage(path, e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(
                    "Ignoring undecodable brew collection at {}: {}",
                    path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Serializes the full collection and replaces the slot with it.
    pub fn save_all(&self, entries: &[BrewEntry]) -> Result<(), StoreError> {
        self.validate_storage_key()?;
        let bytes = serde_json::to_vec(entries)
            .map_err(|e| StoreError::storage(self.path(), io::Error::other(e)))?;
        self.write_slot(&self.path(), &bytes)
    }

    fn write_slot(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StoreError::storage(self.data_dir.clone(), e))?;

        let temp_path = path.with_extension("json.tmp");

        let mut file =
            File::create(&temp_path).map_err(|e| StoreError::storage(temp_path.clone(), e))?;
        file.write_all(bytes)
            .map_err(|e| StoreError::storage(temp_path.clone(), e))?;
        file.sync_all()
            .map_err(|e| StoreError::storage(temp_path.clone(), e))?;

        fs::rename(&temp_path, path).map_err(|e| StoreError::storage(path, e))?;

        Ok(())
    }

    /// Stores a new entry at the front of the collection.
    pub fn create_brew(&self, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        let mut entries = self.get_all()?;

        let now = Utc::now();
        let entry = BrewEntry::new(next_id(&entries, now), fields, now);

        entries.insert(0, entry.clone());
        self.save_all(&entries)?;

        Ok(entry)
    }

    pub fn get_brew(&self, id: &str) -> Result<Option<BrewEntry>, StoreError> {
        Ok(self.get_all()?.into_iter().find(|e| e.id == id))
    }

    /// Replaces the editable fields of the entry with this id.
    pub fn update_brew(&self, id: &str, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        let mut entries = self.get_all()?;

        let slot = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        *slot = slot.clone().updated(fields, Utc::now());
        let updated = slot.clone();

        self.save_all(&entries)?;
        Ok(updated)
    }

    /// Removes the entry with this id if present. The collection is
    /// rewritten either way.
    pub fn delete_brew(&self, id: &str) -> Result<(), StoreError> {
        let mut entries = self.get_all()?;
        entries.retain(|e| e.id != id);
        self.save_all(&entries)
    }

    /// Writes and removes a scratch slot to prove the medium is writable.
    pub fn probe(&self) -> Result<(), StoreError> {
        self.validate_storage_key()?;
        let path = self.probe_path();
        self.write_slot(&path, b"test")?;
        fs::remove_file(&path).map_err(|e| StoreError::storage(path, e))
    }
}

/// Next id for a new entry: the current time in milliseconds, bumped past
/// any numeric id already in use so ids keep increasing.
fn next_id(entries: &[BrewEntry], now: DateTime<Utc>) -> String {
    let candidate = now.timestamp_millis();
    let highest = entries
        .iter()
        .filter_map(|e| e.id.parse::<i64>().ok())
        .max();

    match highest {
        Some(highest) if highest >= candidate => (highest + 1).to_string(),
        _ => candidate.to_string(),
    }
}

#[async_trait]
impl BrewStore for LocalStore {
    async fn create(&self, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        self.create_brew(fields)
    }

    async fn list(&self) -> Result<Vec<BrewEntry>, StoreError> {
        self.get_all()
    }

    async fn get(&self, id: &str) -> Result<Option<BrewEntry>, StoreError> {
        self.get_brew(id)
    }

    async fn update(&self, id: &str, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        self.update_brew(id, fields)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.delete_brew(id)
    }

    async fn check(&self) -> Result<(), StoreError> {
        self.probe()
    }
}
