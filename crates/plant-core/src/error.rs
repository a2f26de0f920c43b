//! Errors raised by the watering coordinator

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur during coordinator operations
#[derive(Error, Debug)]
pub enum PlantError {
    /// Attempted to record a watering later than now
    #[error("Last watered date {value} is in the future (now is {now})")]
    FutureDate {
        value: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Days between waterings must be between 1 and 60, got {0}")]
    InvalidInterval(u32),

    #[error("Plant name '{0}' does not contain any letters or digits")]
    InvalidName(String),

    #[error("A plant with id '{0}' already exists")]
    DeviceExists(String),

    #[error("No plant with id '{0}'")]
    UnknownDevice(String),

    #[error("Unknown health '{0}' (expected one of: unset, poor, fair, good, verygood, excellent)")]
    InvalidHealth(String),

    #[error("Invalid date '{0}' (expected YYYY-MM-DD or an RFC 3339 timestamp)")]
    InvalidDate(String),

    /// Underlying persistence failed; propagated unchanged
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for coordinator operations
pub type PlantResult<T> = Result<T, PlantError>;
