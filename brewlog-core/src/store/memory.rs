//! In-process brew storage.
//!
//! Used in place of a real backend when embedding the journal in tests.
//! Failures can be switched on to exercise the journal's fallback path.

use async_trait::async_trait;
use chrono::Utc;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::BrewStore;
use crate::error::StoreError;
use crate::models::{BrewEntry, BrewFields};

/// Failure injected into every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Unavailable,
    Storage,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<BrewEntry>>,
    failure: Mutex<Option<Failure>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Seeds the store, newest first.
    pub fn with_entries(self, entries: Vec<BrewEntry>) -> Self {
        *lock(&self.entries) = entries;
        self
    }

    /// Every following call fails with `BackendUnavailable`.
    pub fn fail_unavailable(&self) {
        *lock(&self.failure) = Some(Failure::Unavailable);
    }

    /// Every following call fails with `StorageUnavailable`.
    pub fn fail_storage(&self) {
        *lock(&self.failure) = Some(Failure::Storage);
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Number of calls made so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copy of the stored entries, in storage order.
    pub fn snapshot(&self) -> Vec<BrewEntry> {
        lock(&self.entries).clone()
    }

    fn enter(&self) -> Result<MutexGuard<'_, Vec<BrewEntry>>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match *lock(&self.failure) {
            Some(Failure::Unavailable) => Err(StoreError::BackendUnavailable(
                "memory store is failing".to_string(),
            )),
            Some(Failure::Storage) => Err(StoreError::storage(
                "memory",
                io::Error::other("memory store is failing"),
            )),
            None => Ok(lock(&self.entries)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl BrewStore for MemoryStore {
    async fn create(&self, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        let mut entries = self.enter()?;
        let entry = BrewEntry::new(Uuid::new_v4().to_string(), fields, Utc::now());
        entries.insert(0, entry.clone());
        Ok(entry)
    }

    async fn list(&self) -> Result<Vec<BrewEntry>, StoreError> {
        Ok(self.enter()?.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<BrewEntry>, StoreError> {
        Ok(self.enter()?.iter().find(|e| e.id == id).cloned())
    }

    async fn update(&self, id: &str, fields: BrewFields) -> Result<BrewEntry, StoreError> {
        let mut entries = self.enter()?;
        let slot = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        *slot = slot.clone().updated(fields, Utc::now());
        Ok(slot.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.enter()?.retain(|e| e.id != id);
        Ok(())
    }

    async fn check(&self) -> Result<(), StoreError> {
        self.enter().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BrewMethod;

    fn espresso() -> BrewFields {
        BrewFields::new("Brazil Santos", BrewMethod::Espresso, "Extra Fine")
            .with_brew_time(30)
            .with_ratio("1:2")
    }

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let store = MemoryStore::new();

        let created = store.create(espresso()).await.unwrap();
        assert_eq!(store.get(&created.id).await.unwrap(), Some(created.clone()));

        let updated = store
            .update(&created.id, espresso().with_rating(5))
            .await
            .unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.fields.rating, 5);

        store.delete(&created.id).await.unwrap();
        store.delete(&created.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.calls(), 5);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();

        store.fail_unavailable();
        assert!(store.list().await.unwrap_err().is_backend_unavailable());

        store.fail_storage();
        let err = store.create(espresso()).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable { .. }));
        assert!(store.snapshot().is_empty());

        store.recover();
        assert!(store.check().await.is_ok());
        assert_eq!(store.calls(), 3);
    }
}
