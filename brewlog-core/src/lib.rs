//! Brewlog Core Library
//!
//! Brew journal models, the remote and local stores, and the [`Journal`]
//! that chooses between them on every call.

pub mod error;
pub mod journal;
pub mod models;
pub mod store;

pub use error::{FieldError, StoreError, ValidationError};
pub use journal::{HealthReport, Journal, JournalConfig, Served};
pub use models::{is_brew_method, BrewEntry, BrewFields, BrewFilter, BrewMethod};
pub use store::{Backend, BrewStore, LocalStore, MemoryStore, RemoteConfig, RemoteStore};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
