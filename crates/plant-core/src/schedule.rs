//! Watering schedule calculation
//!
//! Pure functions: nothing here reads the store or the clock.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::clock::LocalZone;

/// Smallest allowed watering interval, in days
pub const MIN_INTERVAL_DAYS: u32 = 1;
/// Largest allowed watering interval, in days
pub const MAX_INTERVAL_DAYS: u32 = 60;

/// Where a plant stands relative to its next watering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    /// Next watering is still ahead
    Ok,
    /// Next watering is today
    Due,
    /// Next watering date has passed
    Overdue,
}

impl DueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DueStatus::Ok => "ok",
            DueStatus::Due => "due",
            DueStatus::Overdue => "overdue",
        }
    }

    /// Whether the plant needs water now (due or overdue)
    pub fn needs_water(&self) -> bool {
        !matches!(self, DueStatus::Ok)
    }
}

impl std::fmt::Display for DueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived schedule for one plant at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub last_watered: DateTime<Utc>,
    pub next_watering: DateTime<Utc>,
    pub today: DateTime<Utc>,
    zone: LocalZone,
}

impl Schedule {
    /// Local calendar date of the next watering
    pub fn next_watering_date(&self) -> NaiveDate {
        self.zone.date_of(self.next_watering)
    }

    /// Local calendar date of the last watering
    pub fn last_watered_date(&self) -> NaiveDate {
        self.zone.date_of(self.last_watered)
    }

    /// Local calendar date of "now"
    pub fn today_date(&self) -> NaiveDate {
        self.zone.date_of(self.today)
    }

    pub fn status(&self) -> DueStatus {
        classify(self.today_date(), self.next_watering_date())
    }

    /// Whole days until the next watering; negative when overdue
    pub fn days_until_next(&self) -> i64 {
        (self.next_watering_date() - self.today_date()).num_days()
    }
}

/// Compute the schedule from the stored facts
///
/// Returns `None` when either fact is missing or the next date would fall
/// outside the calendar, meaning "unknown" rather than "not due".
pub fn compute_schedule(
    last_watered: Option<DateTime<Utc>>,
    interval_days: Option<u32>,
    now: DateTime<Utc>,
    zone: LocalZone,
) -> Option<Schedule> {
    let last_watered = last_watered?;
    let interval_days = interval_days?;
    let next_watering =
        last_watered.checked_add_signed(Duration::days(i64::from(interval_days)))?;

    Some(Schedule {
        last_watered,
        next_watering,
        today: now,
        zone,
    })
}

/// Classify by calendar date only
pub fn classify(today: NaiveDate, next_watering: NaiveDate) -> DueStatus {
    match today.cmp(&next_watering) {
        std::cmp::Ordering::Less => DueStatus::Ok,
        std::cmp::Ordering::Equal => DueStatus::Due,
        std::cmp::Ordering::Greater => DueStatus::Overdue,
    }
}

/// Whether `days` is an allowed watering interval
pub fn is_valid_interval(days: u32) -> bool {
    (MIN_INTERVAL_DAYS..=MAX_INTERVAL_DAYS).contains(&days)
}
