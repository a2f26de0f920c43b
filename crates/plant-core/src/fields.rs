//! Per-field capabilities for presentation layers
//!
//! A UI never touches the store directly. It holds small handles, one per
//! displayed value, each implementing one or both of:
//!
//! - [`StatusReader`]: read the current (possibly derived) value
//! - [`MutationSink`]: push a user edit into the coordinator
//!
//! All handles share the plant's [`WateringCoordinator`] and re-read after
//! its refresh notification.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::coordinator::{ToggleOutcome, WateringCoordinator};
use crate::error::PlantResult;
use crate::models::Health;
use crate::schedule::DueStatus;

/// Reads a value derived from the stored record
///
/// `Ok(None)` means the value is unknown (not enough data), not "false".
pub trait StatusReader {
    type Value;

    fn read(&self) -> PlantResult<Option<Self::Value>>;
}

/// Accepts a new value from the user
pub trait MutationSink {
    type Value;
    type Output;

    fn apply(&self, value: Self::Value) -> PlantResult<Self::Output>;
}

/// Last watered date (editable)
pub struct LastWateredField(pub Arc<WateringCoordinator>);

impl StatusReader for LastWateredField {
    type Value = DateTime<Utc>;

    fn read(&self) -> PlantResult<Option<DateTime<Utc>>> {
        self.0.last_watered()
    }
}

impl MutationSink for LastWateredField {
    type Value = DateTime<Utc>;
    type Output = ();

    fn apply(&self, value: DateTime<Utc>) -> PlantResult<()> {
        self.0.set_last_watered(value)
    }
}

/// Days between waterings (editable, 1 to 60)
pub struct IntervalField(pub Arc<WateringCoordinator>);

impl StatusReader for IntervalField {
    type Value = u32;

    fn read(&self) -> PlantResult<Option<u32>> {
        self.0.days_between_waterings()
    }
}

impl MutationSink for IntervalField {
    type Value = u32;
    type Output = ();

    fn apply(&self, days: u32) -> PlantResult<()> {
        self.0.set_days_between_waterings(days)
    }
}

/// Health rating (editable)
pub struct HealthField(pub Arc<WateringCoordinator>);

impl StatusReader for HealthField {
    type Value = Health;

    fn read(&self) -> PlantResult<Option<Health>> {
        self.0.health()
    }
}

impl MutationSink for HealthField {
    type Value = Health;
    type Output = ();

    fn apply(&self, health: Health) -> PlantResult<()> {
        self.0.set_health(health)
    }
}

/// Local date of the next watering
pub struct NextWateringSensor(pub Arc<WateringCoordinator>);

impl StatusReader for NextWateringSensor {
    type Value = NaiveDate;

    fn read(&self) -> PlantResult<Option<NaiveDate>> {
        Ok(self.0.get_due_status()?.map(|s| s.next_watering_date()))
    }
}

/// Ok / due / overdue classification
pub struct StatusSensor(pub Arc<WateringCoordinator>);

impl StatusReader for StatusSensor {
    type Value = DueStatus;

    fn read(&self) -> PlantResult<Option<DueStatus>> {
        Ok(self.0.get_due_status()?.map(|s| s.status()))
    }
}

/// On when the plant should be watered today or is late
pub struct DueSensor(pub Arc<WateringCoordinator>);

impl StatusReader for DueSensor {
    type Value = bool;

    fn read(&self) -> PlantResult<Option<bool>> {
        Ok(self.0.get_due_status()?.map(|s| s.status().needs_water()))
    }
}

/// On only when the watering date has passed
pub struct OverdueSensor(pub Arc<WateringCoordinator>);

impl StatusReader for OverdueSensor {
    type Value = bool;

    fn read(&self) -> PlantResult<Option<bool>> {
        Ok(self
            .0
            .get_due_status()?
            .map(|s| s.status() == DueStatus::Overdue))
    }
}

/// The "mark as watered" button
pub struct MarkWateredButton(pub Arc<WateringCoordinator>);

impl MutationSink for MarkWateredButton {
    type Value = ();
    type Output = ToggleOutcome;

    fn apply(&self, _: ()) -> PlantResult<ToggleOutcome> {
        self.0.mark_as_watered_toggle()
    }
}

impl MarkWateredButton {
    pub fn press(&self) -> PlantResult<ToggleOutcome> {
        self.apply(())
    }
}
