//! Watering coordinator
//!
//! One `WateringCoordinator` per plant. It owns the plant's identity, reads
//! and writes its record through the shared [`Store`], derives the due status
//! with the schedule calculator, and tells subscribers after every mutation.
//!
//! ## Toggle-with-undo
//!
//! `mark_as_watered_toggle` alternates between two stored states per day:
//!
//! 1. last watering is not today: remember it in `previous_last_watered` and
//!    set `last_watered` to now;
//! 2. last watering is today: restore `previous_last_watered` (or re-mark now
//!    when nothing is remembered).
//!
//! Only one level of undo is kept.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::{format_timestamp, parse_timestamp, Clock, LocalZone};
use crate::document::{keys, DeviceData, RenameOutcome};
use crate::error::{PlantError, PlantResult};
use crate::models::{slugify, DeviceRecord, DeviceSetup, Health};
use crate::schedule::{compute_schedule, is_valid_interval, Schedule};
use crate::store::Store;

/// Why subscribers are being asked to re-read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// Nothing has happened yet
    Initial,
    /// A stored field changed
    Updated,
    /// The device id changed
    Renamed,
    /// The record was deleted
    Removed,
    /// The local date rolled over
    DayChanged,
    /// Requested by a caller
    Manual,
}

/// Refresh notification delivered through [`WateringCoordinator::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refresh {
    /// Bumped on every notification
    pub generation: u64,
    pub reason: RefreshReason,
}

/// What a press of the "mark as watered" toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Marked as watered now; the old date is remembered
    Watered,
    /// Already watered today; restored the remembered date
    Undone,
    /// Already watered today with nothing to restore; re-marked now
    Rewatered,
    /// No record exists yet; nothing changed
    Uninitialized,
}

/// Coordinates the watering state of one plant
pub struct WateringCoordinator {
    device_id: RwLock<String>,
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    zone: LocalZone,
    /// Serializes this coordinator's operations
    ops: Mutex<()>,
    refresh_tx: watch::Sender<Refresh>,
}

impl WateringCoordinator {
    /// Create a coordinator for an existing (or not yet stored) plant
    ///
    /// `name` may be a display name or an id; it is slugified either way.
    pub fn new(name: &str, store: Arc<Store>, clock: Arc<dyn Clock>, zone: LocalZone) -> Self {
        let (refresh_tx, _) = watch::channel(Refresh {
            generation: 0,
            reason: RefreshReason::Initial,
        });

        Self {
            device_id: RwLock::new(slugify(name)),
            store,
            clock,
            zone,
            ops: Mutex::new(()),
            refresh_tx,
        }
    }

    /// Register a new plant and write its first record
    pub fn register(
        setup: &DeviceSetup,
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        zone: LocalZone,
    ) -> PlantResult<Self> {
        let device_id = slugify(&setup.name);
        if device_id.is_empty() {
            return Err(PlantError::InvalidName(setup.name.clone()));
        }
        if !is_valid_interval(setup.days_between_waterings) {
            return Err(PlantError::InvalidInterval(setup.days_between_waterings));
        }
        let now = clock.now();
        if setup.last_watered > now {
            return Err(PlantError::FutureDate {
                value: setup.last_watered,
                now,
            });
        }
        if store.contains(&device_id)? {
            return Err(PlantError::DeviceExists(device_id));
        }

        store.save_data(&device_id, setup.to_data())?;
        info!(device = %device_id, "registered plant");

        Ok(Self::new(&device_id, store, clock, zone))
    }

    /// Current device id
    pub fn device_id(&self) -> String {
        self.device_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Zone used for calendar-date comparisons
    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// Current instant according to the injected clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Subscribe to refresh notifications
    pub fn subscribe(&self) -> watch::Receiver<Refresh> {
        self.refresh_tx.subscribe()
    }

    /// Notify subscribers without changing anything
    pub fn refresh(&self, reason: RefreshReason) {
        self.refresh_tx.send_modify(|refresh| {
            refresh.generation += 1;
            refresh.reason = reason;
        });
        debug!(device = %self.device_id(), ?reason, "refresh");
    }

    // ==================== Reads ====================

    /// Raw stored map (empty when the plant has no record)
    pub fn data(&self) -> PlantResult<DeviceData> {
        Ok(self.store.get_data(&self.device_id())?)
    }

    /// Typed view of the stored record, `None` when nothing is stored
    pub fn snapshot(&self) -> PlantResult<Option<DeviceRecord>> {
        let device_id = self.device_id();
        let data = self.store.get_data(&device_id)?;
        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(DeviceRecord::from_data(&device_id, &data, &self.zone)))
    }

    pub fn last_watered(&self) -> PlantResult<Option<DateTime<Utc>>> {
        Ok(self.snapshot()?.and_then(|r| r.last_watered))
    }

    pub fn days_between_waterings(&self) -> PlantResult<Option<u32>> {
        Ok(self.snapshot()?.and_then(|r| r.days_between_waterings))
    }

    pub fn health(&self) -> PlantResult<Option<Health>> {
        Ok(self.snapshot()?.map(|r| r.health))
    }

    /// Derived schedule, `None` when last-watered or the interval is unknown
    pub fn get_due_status(&self) -> PlantResult<Option<Schedule>> {
        let Some(record) = self.snapshot()? else {
            return Ok(None);
        };
        Ok(compute_schedule(
            record.last_watered,
            record.days_between_waterings,
            self.clock.now(),
            self.zone,
        ))
    }

    // ==================== Mutations ====================

    /// Record a watering at `value`
    ///
    /// Fails with [`PlantError::FutureDate`] without writing when `value` is
    /// later than now. A manual date ends any pending same-day undo.
    pub fn set_last_watered(&self, value: DateTime<Utc>) -> PlantResult<()> {
        let _ops = self.lock_ops();
        self.write_last_watered(
            &self.device_id(),
            value,
            DeviceData::new(),
            &[keys::PREVIOUS_LAST_WATERED],
        )
    }

    /// Mark as watered, or undo a marking made earlier today
    pub fn mark_as_watered_toggle(&self) -> PlantResult<ToggleOutcome> {
        let _ops = self.lock_ops();
        let device_id = self.device_id();

        let data = self.store.get_data(&device_id)?;
        if data.is_empty() {
            warn!(device = %device_id, "toggle ignored: plant has no stored record yet");
            return Ok(ToggleOutcome::Uninitialized);
        }

        let now = self.clock.now();
        let today = self.zone.date_of(now);
        let stored = |key: &str| data.get(key).and_then(|v| parse_timestamp(v, &self.zone));
        let last = stored(keys::LAST_WATERED);
        let previous = stored(keys::PREVIOUS_LAST_WATERED);

        match last {
            Some(last) if self.zone.date_of(last) == today => match previous {
                Some(previous) => {
                    self.write_last_watered(&device_id, previous, DeviceData::new(), &[])?;
                    info!(device = %device_id, restored = %previous, "undid watering");
                    Ok(ToggleOutcome::Undone)
                }
                None => {
                    self.write_last_watered(&device_id, now, DeviceData::new(), &[])?;
                    info!(device = %device_id, "re-marked as watered");
                    Ok(ToggleOutcome::Rewatered)
                }
            },
            _ => {
                let mut remember = DeviceData::new();
                if let Some(last) = last {
                    remember.insert(
                        keys::PREVIOUS_LAST_WATERED.to_string(),
                        format_timestamp(last),
                    );
                }
                self.write_last_watered(&device_id, now, remember, &[])?;
                info!(device = %device_id, "marked as watered");
                Ok(ToggleOutcome::Watered)
            }
        }
    }

    pub fn set_days_between_waterings(&self, days: u32) -> PlantResult<()> {
        if !is_valid_interval(days) {
            return Err(PlantError::InvalidInterval(days));
        }
        self.save_field(keys::DAYS_BETWEEN_WATERINGS, days.to_string())
    }

    pub fn set_health(&self, health: Health) -> PlantResult<()> {
        self.save_field(keys::HEALTH, health.to_string())
    }

    /// Set or clear (`None`) the species text
    pub fn set_species(&self, species: Option<&str>) -> PlantResult<()> {
        let value = species.map(str::trim).unwrap_or_default();
        self.save_field(keys::SPECIES, value.to_string())
    }

    pub fn set_photo_path(&self, path: &str) -> PlantResult<()> {
        self.save_field(keys::PHOTO, path.to_string())
    }

    /// Store an auxiliary value on behalf of a presentation component
    ///
    /// The key is namespaced with the device id unless it already is, so it
    /// can never shadow a schedule field or another plant's key. Returns the
    /// key actually written.
    pub fn store_value(&self, key: &str, value: &str) -> PlantResult<String> {
        let device_id = self.device_id();
        let namespaced = if key.starts_with(&format!("{device_id}_"))
            || key.ends_with(&format!("_{device_id}"))
        {
            key.to_string()
        } else {
            format!("{key}_{device_id}")
        };

        self.save_field(&namespaced, value.to_string())?;
        Ok(namespaced)
    }

    /// Move this plant's record to the id derived from `new_name`
    ///
    /// Must run before anything else starts using the new name. Returns the
    /// new device id.
    pub fn rename_device(&self, new_name: &str) -> PlantResult<String> {
        let _ops = self.lock_ops();
        let new_id = slugify(new_name);
        if new_id.is_empty() {
            return Err(PlantError::InvalidName(new_name.to_string()));
        }

        let old_id = self.device_id();
        let name = DeviceData::from([(keys::NAME.to_string(), new_name.trim().to_string())]);
        match self.store.rename_device(&old_id, &new_id, name)? {
            RenameOutcome::Renamed => {}
            RenameOutcome::NotFound => return Err(PlantError::UnknownDevice(old_id)),
            RenameOutcome::TargetExists => return Err(PlantError::DeviceExists(new_id)),
        }

        *self
            .device_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = new_id.clone();
        self.refresh(RefreshReason::Renamed);
        Ok(new_id)
    }

    /// Delete this plant's record
    ///
    /// Subscribers are still notified; they will read an empty record.
    /// Returns whether anything was stored.
    pub fn remove_device_from_storage(&self) -> PlantResult<bool> {
        let _ops = self.lock_ops();
        let removed = self.store.remove_device(&self.device_id())?;
        self.refresh(RefreshReason::Removed);
        Ok(removed)
    }

    fn write_last_watered(
        &self,
        device_id: &str,
        value: DateTime<Utc>,
        mut partial: DeviceData,
        removed: &[&str],
    ) -> PlantResult<()> {
        let now = self.clock.now();
        if value > now {
            return Err(PlantError::FutureDate { value, now });
        }

        partial.insert(keys::LAST_WATERED.to_string(), format_timestamp(value));
        self.store.update_data(device_id, partial, removed)?;
        self.refresh(RefreshReason::Updated);
        Ok(())
    }

    fn save_field(&self, key: &str, value: String) -> PlantResult<()> {
        let _ops = self.lock_ops();
        self.store
            .save_data(&self.device_id(), DeviceData::from([(key.to_string(), value)]))?;
        self.refresh(RefreshReason::Updated);
        Ok(())
    }

    fn lock_ops(&self) -> MutexGuard<'_, ()> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
