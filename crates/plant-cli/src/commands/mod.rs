//! Command handlers
//!
//! Every handler receives the opened [`Garden`] and an [`Output`] and
//! returns `anyhow::Result`.
//!
//! [`Output`]: crate::output::Output

pub mod config;
pub mod plant;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use plant_core::clock::parse_timestamp;
use plant_core::{
    Clock, Config, LocalZone, PlantError, PlantResult, Store, SystemClock, WateringCoordinator,
};

use crate::output::PlantView;

/// Everything a command needs: config, the shared store, clock and zone
pub struct Garden {
    pub config: Config,
    pub store: Arc<Store>,
    pub clock: Arc<dyn Clock>,
    pub zone: LocalZone,
}

impl Garden {
    /// Open the store described by `config` using the system clock
    pub fn open(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let zone = config.zone().context("Invalid time zone configuration")?;
        let store = Arc::new(Store::open_with_config(&config));
        Ok(Self {
            config,
            store,
            clock,
            zone,
        })
    }

    /// Coordinator for `name`, whether or not it has a record
    pub fn coordinator(&self, name: &str) -> WateringCoordinator {
        WateringCoordinator::new(
            name,
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.zone,
        )
    }

    /// Coordinator for a plant that must already exist
    pub fn existing(&self, name: &str) -> PlantResult<Arc<WateringCoordinator>> {
        let coordinator = self.coordinator(name);
        let device_id = coordinator.device_id();
        if !self.store.contains(&device_id)? {
            return Err(PlantError::UnknownDevice(device_id));
        }
        Ok(Arc::new(coordinator))
    }

    /// Coordinators for every stored plant, in id order
    pub fn all(&self) -> PlantResult<Vec<Arc<WateringCoordinator>>> {
        Ok(self
            .store
            .device_ids()?
            .iter()
            .map(|id| Arc::new(self.coordinator(id)))
            .collect())
    }

    /// What to display for one plant, `None` when it has no record
    pub fn view(&self, coordinator: &WateringCoordinator) -> PlantResult<Option<PlantView>> {
        let Some(record) = coordinator.snapshot()? else {
            return Ok(None);
        };
        let schedule = coordinator.get_due_status()?;
        Ok(Some(PlantView::new(&record, schedule)))
    }

    /// Parse a date given on the command line
    ///
    /// Accepts `today`, `yesterday`, a bare `YYYY-MM-DD` (start of that local
    /// day) or an RFC 3339 timestamp.
    pub fn parse_date(&self, input: &str) -> PlantResult<DateTime<Utc>> {
        let now = self.clock.now();
        match input.trim().to_lowercase().as_str() {
            "today" | "now" => Ok(now),
            "yesterday" => Ok(now - Duration::days(1)),
            _ => parse_timestamp(input.trim(), &self.zone)
                .ok_or_else(|| PlantError::InvalidDate(input.to_string())),
        }
    }
}
