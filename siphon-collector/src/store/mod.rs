//! Entry store layer
//!
//! Stores abstract the system crash-entry store. They hand out one entry at a
//! time, newest first below a timestamp, and never interpret payloads.
//!
//! All stores are trait-based to enable testing and mocking.

mod directory;

use siphon_core::domain::entry::CrashEntry;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::StoreError;

pub use directory::DirectoryEntryStore;

/// Read access to a crash-entry store
pub trait EntryStore: Send + Sync {
    /// Returns the newest entry tagged `tag` whose timestamp is strictly
    /// below `before_millis`, or `None` when there is no such entry
    ///
    /// The caller owns the returned entry and must release it before the
    /// next query.
    fn next_entry_before(
        &self,
        tag: &str,
        before_millis: i64,
    ) -> Result<Option<CrashEntry>, StoreError>;
}

impl<T: EntryStore + ?Sized> EntryStore for Arc<T> {
    fn next_entry_before(
        &self,
        tag: &str,
        before_millis: i64,
    ) -> Result<Option<CrashEntry>, StoreError> {
        (**self).next_entry_before(tag, before_millis)
    }
}

/// Opens a store handle for a collection run
pub trait StoreOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn EntryStore>, StoreError>;
}

/// Opens a [`DirectoryEntryStore`] at a fixed path on every run
#[derive(Debug, Clone)]
pub struct DirectoryStoreOpener {
    dir: PathBuf,
}

impl DirectoryStoreOpener {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StoreOpener for DirectoryStoreOpener {
    fn open(&self) -> Result<Box<dyn EntryStore>, StoreError> {
        let store = DirectoryEntryStore::open(&self.dir)?;
        Ok(Box::new(store))
    }
}
