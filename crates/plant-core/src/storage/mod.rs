//! Storage layer
//!
//! Handles persistence of the device document.
//!
//! ## Layout
//!
//! - **devices.json**: the versioned document holding every device's record,
//!   rewritten atomically on each mutation

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::JsonPersistence;
