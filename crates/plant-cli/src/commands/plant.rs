//! Plant command handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;

use plant_core::fields::{
    DueSensor, HealthField, IntervalField, LastWateredField, MarkWateredButton, MutationSink,
    StatusReader,
};
use plant_core::{Clock, DeviceSetup, Health, PlantError, WateringCoordinator};

use super::Garden;
use crate::output::Output;

/// Editable plant fields for `plant set`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlantField {
    /// Days between waterings (1-60)
    Interval,
    /// Health rating
    Health,
    /// Species text ("" or "none" clears it)
    Species,
    /// Path to a photo
    Photo,
}

/// Options for `plant add`
#[derive(Debug, Default)]
pub struct AddOptions {
    pub last_watered: Option<String>,
    pub every: Option<u32>,
    pub health: Option<String>,
    pub species: Option<String>,
    pub photo: Option<String>,
}

/// Register a new plant
pub fn add(garden: &Garden, name: String, options: AddOptions, output: &Output) -> Result<()> {
    let last_watered = match options.last_watered {
        Some(ref date) => garden.parse_date(date)?,
        None => garden.clock.now(),
    };
    let days = options
        .every
        .unwrap_or(garden.config.default_interval_days);

    let mut setup = DeviceSetup::new(name, last_watered, days);
    if let Some(ref health) = options.health {
        setup.health = parse_health(health)?;
    }
    setup.species = options.species.filter(|s| !s.trim().is_empty());
    setup.photo_path = options.photo.filter(|p| !p.trim().is_empty());

    let coordinator = WateringCoordinator::register(
        &setup,
        Arc::clone(&garden.store),
        Arc::clone(&garden.clock),
        garden.zone,
    )
    .context("Failed to add plant")?;

    if output.is_quiet() {
        println!("{}", coordinator.device_id());
        return Ok(());
    }
    output.success(&format!(
        "Added {} ({}), watered every {} day(s)",
        setup.name.trim(),
        coordinator.device_id(),
        days
    ));
    Ok(())
}

/// List plants, optionally only those needing water
pub fn list(garden: &Garden, due_only: bool, output: &Output) -> Result<()> {
    let mut plants = Vec::new();
    for coordinator in garden.all()? {
        if due_only && DueSensor(Arc::clone(&coordinator)).read()? != Some(true) {
            continue;
        }
        if let Some(view) = garden.view(&coordinator)? {
            plants.push(view);
        }
    }

    output.print_plants(&plants);
    Ok(())
}

/// Show one plant
pub fn show(garden: &Garden, name: &str, output: &Output) -> Result<()> {
    let coordinator = garden.existing(name)?;
    let view = garden
        .view(&coordinator)?
        .ok_or_else(|| PlantError::UnknownDevice(coordinator.device_id()))?;

    output.print_plant(&view);
    Ok(())
}

/// Press the watering toggle
pub fn water(garden: &Garden, name: &str, output: &Output) -> Result<()> {
    let coordinator = garden.existing(name)?;
    let outcome = MarkWateredButton(Arc::clone(&coordinator)).press()?;

    output.print_toggle(&coordinator.device_id(), outcome);
    Ok(())
}

/// Set the last watered date explicitly
pub fn set_watered(garden: &Garden, name: &str, date: &str, output: &Output) -> Result<()> {
    let coordinator = garden.existing(name)?;
    let when = garden.parse_date(date)?;
    LastWateredField(Arc::clone(&coordinator)).apply(when)?;

    output.success(&format!(
        "Set last watered for {} to {}",
        coordinator.device_id(),
        garden.zone.date_of(when)
    ));
    Ok(())
}

/// Set a single editable field
pub fn set(
    garden: &Garden,
    name: &str,
    field: PlantField,
    value: &str,
    output: &Output,
) -> Result<()> {
    let coordinator = garden.existing(name)?;

    match field {
        PlantField::Interval => {
            let days = value
                .trim()
                .parse::<u32>()
                .with_context(|| format!("Interval must be a whole number of days, got '{}'", value))?;
            IntervalField(Arc::clone(&coordinator)).apply(days)?;
        }
        PlantField::Health => {
            HealthField(Arc::clone(&coordinator)).apply(parse_health(value)?)?;
        }
        PlantField::Species => {
            let species = match value.trim() {
                "" | "none" => None,
                other => Some(other),
            };
            coordinator.set_species(species)?;
        }
        PlantField::Photo => {
            coordinator.set_photo_path(value.trim())?;
        }
    }

    output.success(&format!(
        "Set {} of {} to {}",
        field_name(field),
        coordinator.device_id(),
        value
    ));
    Ok(())
}

/// Rename a plant, moving its record to the new id
pub fn rename(garden: &Garden, name: &str, new_name: &str, output: &Output) -> Result<()> {
    let coordinator = garden.existing(name)?;
    let old_id = coordinator.device_id();
    let new_id = coordinator
        .rename_device(new_name)
        .with_context(|| format!("Failed to rename {}", old_id))?;

    if output.is_quiet() {
        println!("{}", new_id);
        return Ok(());
    }
    output.success(&format!("Renamed {} to {}", old_id, new_id));
    Ok(())
}

/// Delete a plant's record
pub fn remove(garden: &Garden, name: &str, output: &Output) -> Result<()> {
    let coordinator = garden.existing(name)?;
    coordinator.remove_device_from_storage()?;

    output.success(&format!("Removed {}", coordinator.device_id()));
    Ok(())
}

fn parse_health(value: &str) -> Result<Health, PlantError> {
    value
        .parse()
        .map_err(|_| PlantError::InvalidHealth(value.to_string()))
}

fn field_name(field: PlantField) -> &'static str {
    match field {
        PlantField::Interval => "interval",
        PlantField::Health => "health",
        PlantField::Species => "species",
        PlantField::Photo => "photo",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use plant_core::{DueStatus, FixedClock, Store};
    use tempfile::TempDir;

    use crate::commands::test_support::garden;
    use crate::output::OutputFormat;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    fn add_rose(garden: &Garden) {
        let options = AddOptions {
            last_watered: Some("2024-01-01".to_string()),
            every: Some(7),
            ..AddOptions::default()
        };
        add(garden, "Rose".to_string(), options, &quiet()).unwrap();
    }

    #[test]
    fn test_add_uses_configured_default_interval() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 5);

        add(&garden, "Fern".to_string(), AddOptions::default(), &quiet()).unwrap();

        let fern = garden.existing("fern").unwrap();
        assert_eq!(fern.days_between_waterings().unwrap(), Some(7));
        assert_eq!(fern.last_watered().unwrap(), Some(garden.clock.now()));
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 5);

        let future = AddOptions {
            last_watered: Some("2024-02-01".to_string()),
            ..AddOptions::default()
        };
        assert!(add(&garden, "Rose".to_string(), future, &quiet()).is_err());

        let bad_health = AddOptions {
            health: Some("great".to_string()),
            ..AddOptions::default()
        };
        assert!(add(&garden, "Rose".to_string(), bad_health, &quiet()).is_err());

        let bad_interval = AddOptions {
            every: Some(61),
            ..AddOptions::default()
        };
        assert!(add(&garden, "Rose".to_string(), bad_interval, &quiet()).is_err());

        assert!(garden.store.device_ids().unwrap().is_empty());
    }

    #[test]
    fn test_add_twice_fails() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 5);

        add_rose(&garden);
        let err = add(&garden, "rose".to_string(), AddOptions::default(), &quiet()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlantError>(),
            Some(PlantError::DeviceExists(_))
        ));
    }

    #[test]
    fn test_water_twice_restores_previous_date() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 5);
        add_rose(&garden);
        let jan_1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        water(&garden, "Rose", &quiet()).unwrap();
        let rose = garden.existing("rose").unwrap();
        assert_eq!(rose.last_watered().unwrap(), Some(garden.clock.now()));

        water(&garden, "Rose", &quiet()).unwrap();
        assert_eq!(rose.last_watered().unwrap(), Some(jan_1));
    }

    #[test]
    fn test_set_fields() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 5);
        add_rose(&garden);

        set(&garden, "rose", PlantField::Interval, "3", &quiet()).unwrap();
        set(&garden, "rose", PlantField::Health, "very good", &quiet()).unwrap();
        set(&garden, "rose", PlantField::Species, "Rosa canina", &quiet()).unwrap();

        let record = garden.existing("rose").unwrap().snapshot().unwrap().unwrap();
        assert_eq!(record.days_between_waterings, Some(3));
        assert_eq!(record.health, Health::VeryGood);
        assert_eq!(record.species.as_deref(), Some("Rosa canina"));

        set(&garden, "rose", PlantField::Species, "none", &quiet()).unwrap();
        let record = garden.existing("rose").unwrap().snapshot().unwrap().unwrap();
        assert_eq!(record.species, None);

        assert!(set(&garden, "rose", PlantField::Interval, "0", &quiet()).is_err());
        assert!(set(&garden, "rose", PlantField::Interval, "weekly", &quiet()).is_err());
        assert!(set(&garden, "rose", PlantField::Health, "meh", &quiet()).is_err());
    }

    #[test]
    fn test_set_watered_and_status() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 12);
        add_rose(&garden);

        let rose = garden.existing("rose").unwrap();
        assert_eq!(
            rose.get_due_status().unwrap().unwrap().status(),
            DueStatus::Overdue
        );

        set_watered(&garden, "rose", "2024-01-10", &quiet()).unwrap();
        assert_eq!(
            rose.get_due_status().unwrap().unwrap().status(),
            DueStatus::Ok
        );
        assert!(set_watered(&garden, "rose", "2024-01-13", &quiet()).is_err());
    }

    #[test]
    fn test_due_filter_skips_plants_with_unknown_schedule() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 12);
        add_rose(&garden);
        garden
            .store
            .save_data(
                "fern",
                plant_core::DeviceData::from([("name".to_string(), "Fern".to_string())]),
            )
            .unwrap();

        let due: Vec<String> = garden
            .all()
            .unwrap()
            .into_iter()
            .filter(|c| DueSensor(Arc::clone(c)).read().unwrap() == Some(true))
            .map(|c| c.device_id())
            .collect();
        assert_eq!(due, vec!["rose".to_string()]);
        list(&garden, true, &quiet()).unwrap();
    }

    #[test]
    fn test_commands_on_unknown_plant_fail() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 5);

        assert!(show(&garden, "ghost", &quiet()).is_err());
        assert!(water(&garden, "ghost", &quiet()).is_err());
        assert!(remove(&garden, "ghost", &quiet()).is_err());
        assert!(rename(&garden, "ghost", "spirit", &quiet()).is_err());
    }

    #[test]
    fn test_rename_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 5);
        add_rose(&garden);

        rename(&garden, "rose", "Climbing Rose", &quiet()).unwrap();
        assert!(garden.existing("rose").is_err());
        let renamed = garden.existing("climbing_rose").unwrap();
        assert_eq!(
            renamed.snapshot().unwrap().unwrap().display_name(),
            "Climbing Rose"
        );

        remove(&garden, "climbing_rose", &quiet()).unwrap();
        assert!(garden.store.device_ids().unwrap().is_empty());
    }

    #[test]
    fn test_changes_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let (garden, _) = garden(&temp_dir, 5);
        add_rose(&garden);
        water(&garden, "rose", &quiet()).unwrap();

        let reopened = Store::open_with_config(&garden.config);
        assert_eq!(reopened.device_ids().unwrap(), vec!["rose".to_string()]);

        let clock = Arc::new(FixedClock::new(garden.clock.now() + Duration::days(1)));
        let next_day = Garden::with_clock(garden.config.clone(), clock).unwrap();
        let rose = next_day.existing("rose").unwrap();
        assert_eq!(
            rose.get_due_status().unwrap().unwrap().days_until_next(),
            6
        );
    }
}
