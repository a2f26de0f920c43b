//! Plant Core Library
//!
//! Tracks when each plant was last watered, how often it needs water, and
//! whether it is due or overdue.
//!
//! # Architecture
//!
//! - **Store**: one versioned JSON document holding every plant's key/value
//!   record, shared by handle and rewritten atomically on each change
//! - **Schedule**: pure due/overdue calculation from last-watered + interval
//! - **Coordinator**: per-plant mutations (including toggle-with-undo) and
//!   refresh notifications
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = Arc::new(Store::open_with_config(&config));
//! let rose = WateringCoordinator::new("Rose", store, Arc::new(SystemClock), config.zone()?);
//!
//! rose.mark_as_watered_toggle()?;
//! let status = rose.get_due_status()?.map(|s| s.status());
//! ```
//!
//! # Modules
//!
//! - `store`: shared, lazily loaded device store
//! - `coordinator`: per-plant watering coordinator
//! - `schedule`: due/overdue calculation
//! - `fields`: reader and sink handles for presentation layers
//! - `daily`: refresh at local midnight
//! - `clock`: injectable clock and local calendar
//! - `document`: the persisted document structure
//! - `storage`: document persistence
//! - `models`: typed records, health, slugs
//! - `config`: application configuration

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod daily;
pub mod document;
pub mod error;
pub mod fields;
pub mod models;
pub mod schedule;
pub mod storage;
pub mod store;

pub use clock::{Clock, FixedClock, LocalZone, SystemClock};
pub use config::Config;
pub use coordinator::{Refresh, RefreshReason, ToggleOutcome, WateringCoordinator};
pub use document::{DeviceData, DeviceDocument, RenameOutcome};
pub use error::{PlantError, PlantResult};
pub use models::{slugify, DeviceRecord, DeviceSetup, Health};
pub use schedule::{compute_schedule, DueStatus, Schedule};
pub use storage::{JsonPersistence, StorageError};
pub use store::Store;
