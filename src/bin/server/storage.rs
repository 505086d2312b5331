//! Table storage for the document store.
//!
//! Each table is one JSON object file mapping id to document:
//! ```text
//! <DATA_DIR>/
//!   coffee-brews.json    {"<id>": {...}, ...}
//! ```
//!
//! Read-modify-write cycles are serialized through one async lock and every
//! write replaces the file atomically (temp file + rename).

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Attributes an update may never overwrite.
const IMMUTABLE_ATTRIBUTES: [&str; 2] = ["id", "created_at"];

type Items = BTreeMap<String, Value>;

/// Errors that can occur during table storage operations.
#[derive(Debug)]
pub enum TableStorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// Table file exists but is not a JSON object of documents.
    CorruptTable(PathBuf, String),
    /// Invalid table name (e.g., contains path separators).
    InvalidTableName(String),
    /// Document body is not a JSON object.
    InvalidItem(String),
}

impl std::fmt::Display for TableStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            TableStorageError::CorruptTable(path, e) => {
                write!(f, "Failed to load table {}: {}", path.display(), e)
            }
            TableStorageError::InvalidTableName(name) => {
                write!(f, "Invalid table name: {}", name)
            }
            TableStorageError::InvalidItem(id) => {
                write!(f, "Item {} must be a JSON object", id)
            }
        }
    }
}

impl std::error::Error for TableStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableStorageError::IoError(_, e) => Some(e),
            _ => None,
        }
    }
}

/// File-backed document tables.
#[derive(Debug)]
pub struct TableStorage {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl TableStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Validates a table name to prevent path traversal attacks.
    fn validate_table_name(table: &str) -> Result<(), TableStorageError> {
        if table.is_empty()
            || table.contains('/')
            || table.contains('\\')
            || table.contains("..")
            || table.starts_with('.')
        {
            return Err(TableStorageError::InvalidTableName(table.to_string()));
        }
        Ok(())
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", table))
    }

    fn load(&self, table: &str) -> Result<Items, TableStorageError> {
        Self::validate_table_name(table)?;
        let path = self.table_path(table);

        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| TableStorageError::CorruptTable(path, e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Items::new()),
            Err(e) => Err(TableStorageError::IoError(path, e)),
        }
    }

    fn save(&self, table: &str, items: &Items) -> Result<(), TableStorageError> {
        Self::validate_table_name(table)?;
        let path = self.table_path(table);

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| TableStorageError::IoError(self.data_dir.clone(), e))?;

        let bytes = serde_json::to_vec(items)
            .map_err(|e| TableStorageError::IoError(path.clone(), io::Error::other(e)))?;

        // Write atomically using temp file + rename
        let temp_path = path.with_extension("json.tmp");

        let mut file = File::create(&temp_path)
            .map_err(|e| TableStorageError::IoError(temp_path.clone(), e))?;

        file.write_all(&bytes)
            .map_err(|e| TableStorageError::IoError(temp_path.clone(), e))?;

        file.sync_all()
            .map_err(|e| TableStorageError::IoError(temp_path.clone(), e))?;

        fs::rename(&temp_path, &path).map_err(|e| TableStorageError::IoError(path, e))?;

        Ok(())
    }

    /// Every document in the table.
    pub async fn scan(&self, table: &str) -> Result<Vec<Value>, TableStorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load(table)?.into_values().collect())
    }

    pub async fn get(&self, table: &str, id: &str) -> Result<Option<Value>, TableStorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load(table)?.remove(id))
    }

    /// Stores `item` under `id`, replacing any existing document.
    pub async fn put(
        &self,
        table: &str,
        id: &str,
        item: Value,
    ) -> Result<Value, TableStorageError> {
        let Value::Object(mut document) = item else {
            return Err(TableStorageError::InvalidItem(id.to_string()));
        };
        document.insert("id".to_string(), Value::String(id.to_string()));
        let document = Value::Object(document);

        let _guard = self.lock.lock().await;
        let mut items = self.load(table)?;
        items.insert(id.to_string(), document.clone());
        self.save(table, &items)?;

        Ok(document)
    }

    /// Merges `attributes` into an existing document.
    ///
    /// Returns `None` when there is no document with this id. `id` and
    /// `created_at` are never changed.
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        attributes: Map<String, Value>,
    ) -> Result<Option<Value>, TableStorageError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load(table)?;

        let Some(document) = items.get_mut(id) else {
            return Ok(None);
        };
        let Value::Object(fields) = document else {
            return Err(TableStorageError::InvalidItem(id.to_string()));
        };

        for (key, value) in attributes {
            if !IMMUTABLE_ATTRIBUTES.contains(&key.as_str()) {
                fields.insert(key, value);
            }
        }
        let updated = document.clone();

        self.save(table, &items)?;
        Ok(Some(updated))
    }

    /// Removes a document. Returns whether it existed.
    pub async fn delete(&self, table: &str, id: &str) -> Result<bool, TableStorageError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load(table)?;

        if items.remove(id).is_none() {
            return Ok(false);
        }

        self.save(table, &items)?;
        Ok(true)
    }
}
