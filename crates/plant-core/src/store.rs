//! Shared device store
//!
//! The `Store` is the one handle on the device document for the whole
//! process. Coordinators for different devices share it through an `Arc`.
//!
//! ## Caching
//!
//! The document is loaded lazily on first access and then cached. Every
//! mutation runs load, merge and persist inside a single critical section
//! against the cached copy, so writes for one device never clobber another
//! device's concurrent write.
//!
//! A mutation is applied to a working copy first; the cache only takes the
//! new value once the document has reached disk.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Arc::new(Store::open_with_config(&config));
//!
//! store.save_data("rose", [("health".into(), "good".into())].into())?;
//! let rose = store.get_data("rose")?;
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::config::Config;
use crate::document::{DeviceData, DeviceDocument, RenameOutcome};
use crate::storage::{JsonPersistence, StorageResult};

/// Process-wide store of device records
pub struct Store {
    persistence: JsonPersistence,
    /// `None` until the first load
    cache: Mutex<Option<DeviceDocument>>,
}

impl Store {
    /// Create a store backed by the given persistence handler
    ///
    /// Nothing is read until the first access.
    pub fn new(persistence: JsonPersistence) -> Self {
        Self {
            persistence,
            cache: Mutex::new(None),
        }
    }

    /// Create a store for the document in the configured data directory
    pub fn open_with_config(config: &Config) -> Self {
        Self::new(JsonPersistence::from_config(config))
    }

    /// The persistence handler backing this store
    pub fn persistence(&self) -> &JsonPersistence {
        &self.persistence
    }

    /// Load the document, or start an empty one if none exists on disk
    ///
    /// Only the first call reads from disk; later calls return the cached
    /// copy.
    pub fn load(&self) -> StorageResult<DeviceDocument> {
        let mut cache = self.lock();
        Ok(self.ensure_loaded(&mut cache)?.clone())
    }

    /// Get a device's key/value map, or an empty map for an unknown device
    pub fn get_data(&self, device_id: &str) -> StorageResult<DeviceData> {
        let mut cache = self.lock();
        let doc = self.ensure_loaded(&mut cache)?;
        Ok(doc.device(device_id).cloned().unwrap_or_default())
    }

    /// Check whether a record exists for `device_id`
    pub fn contains(&self, device_id: &str) -> StorageResult<bool> {
        let mut cache = self.lock();
        let doc = self.ensure_loaded(&mut cache)?;
        Ok(doc.device(device_id).is_some())
    }

    /// Ids of all stored devices, sorted
    pub fn device_ids(&self) -> StorageResult<Vec<String>> {
        let mut cache = self.lock();
        Ok(self.ensure_loaded(&mut cache)?.device_ids())
    }

    /// Merge `partial` into a device's map and persist the whole document
    pub fn save_data(&self, device_id: &str, partial: DeviceData) -> StorageResult<()> {
        self.update_data(device_id, partial, &[])
    }

    /// Merge `partial`, drop the `removed` keys, and persist in one write
    pub fn update_data(
        &self,
        device_id: &str,
        partial: DeviceData,
        removed: &[&str],
    ) -> StorageResult<()> {
        debug!(
            device = device_id,
            keys = ?partial.keys().collect::<Vec<_>>(),
            ?removed,
            "saving device data"
        );
        self.mutate(|doc| {
            doc.update(device_id, partial, removed);
            true
        })?;
        Ok(())
    }

    /// Delete a device's record entirely and persist
    ///
    /// Returns whether the device existed.
    pub fn remove_device(&self, device_id: &str) -> StorageResult<bool> {
        let removed = self.mutate(|doc| doc.remove(device_id))?;
        if removed {
            info!(device = device_id, "removed device from storage");
        }
        Ok(removed)
    }

    /// Move a device's record to a new id, migrating device-scoped keys and
    /// values, then merge `updates` into the moved record; persists once
    ///
    /// Refuses without writing when the old id is unknown or the new id is
    /// already taken.
    pub fn rename_device(
        &self,
        old_id: &str,
        new_id: &str,
        updates: DeviceData,
    ) -> StorageResult<RenameOutcome> {
        let mut outcome = RenameOutcome::NotFound;
        self.mutate(|doc| {
            outcome = doc.rename(old_id, new_id);
            if outcome != RenameOutcome::Renamed {
                return false;
            }
            doc.merge(new_id, updates);
            true
        })?;

        if outcome == RenameOutcome::Renamed {
            info!(from = old_id, to = new_id, "renamed device in storage");
        }
        Ok(outcome)
    }

    /// Apply `change` to a working copy of the document and persist it
    ///
    /// `change` returns whether it modified anything; unchanged documents are
    /// not rewritten.
    fn mutate<F>(&self, change: F) -> StorageResult<bool>
    where
        F: FnOnce(&mut DeviceDocument) -> bool,
    {
        let mut cache = self.lock();
        let mut working = self.ensure_loaded(&mut cache)?.clone();

        if !change(&mut working) {
            return Ok(false);
        }

        self.persistence.save(&working)?;
        *cache = Some(working);
        Ok(true)
    }

    fn ensure_loaded<'a>(
        &self,
        cache: &'a mut MutexGuard<'_, Option<DeviceDocument>>,
    ) -> StorageResult<&'a mut DeviceDocument> {
        if cache.is_none() {
            let doc = self.persistence.load()?.unwrap_or_default();
            **cache = Some(doc);
        }
        Ok(cache.get_or_insert_with(DeviceDocument::new))
    }

    fn lock(&self) -> MutexGuard<'_, Option<DeviceDocument>> {
        // The cache is only swapped after a successful write, so a panic
        // elsewhere cannot leave it half-updated.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
