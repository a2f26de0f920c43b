//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::NaiveDate;
use serde::Serialize;

use plant_core::{
    DeviceRecord, DueStatus, Health, PlantError, Schedule, StorageError, ToggleOutcome,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// What the CLI shows for one plant
#[derive(Debug, Clone, Serialize)]
pub struct PlantView {
    pub id: String,
    pub name: String,
    pub last_watered: Option<NaiveDate>,
    pub next_watering: Option<NaiveDate>,
    pub days_until_next: Option<i64>,
    /// `None` when the schedule is unknown
    pub status: Option<DueStatus>,
    pub days_between_waterings: Option<u32>,
    pub health: Health,
    pub species: Option<String>,
    pub photo: Option<String>,
    /// Whether pressing `water` again today would undo
    pub undo_available: bool,
}

impl PlantView {
    pub fn new(record: &DeviceRecord, schedule: Option<Schedule>) -> Self {
        let last_watered = schedule.map(|s| s.last_watered_date());
        let undo_available = match (schedule, record.previous_last_watered) {
            (Some(s), Some(_)) => s.last_watered_date() == s.today_date(),
            _ => false,
        };

        Self {
            id: record.device_id.clone(),
            name: record.display_name().to_string(),
            last_watered,
            next_watering: schedule.map(|s| s.next_watering_date()),
            days_until_next: schedule.map(|s| s.days_until_next()),
            status: schedule.map(|s| s.status()),
            days_between_waterings: record.days_between_waterings,
            health: record.health,
            species: record.species.clone(),
            photo: record.photo_path.clone(),
            undo_available,
        }
    }

    fn status_label(&self) -> String {
        match (self.status, self.days_until_next) {
            (Some(DueStatus::Ok), Some(days)) => format!("ok (in {} day{})", days, plural(days)),
            (Some(DueStatus::Due), _) => "due today".to_string(),
            (Some(DueStatus::Overdue), Some(days)) => {
                format!("overdue by {} day{}", -days, plural(-days))
            }
            (Some(status), None) => status.to_string(),
            (None, _) => "unknown".to_string(),
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single plant
    pub fn print_plant(&self, plant: &PlantView) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:            {}", plant.id);
                println!("Name:          {}", plant.name);
                println!("Last watered:  {}", date_or_dash(plant.last_watered));
                println!(
                    "Interval:      {}",
                    plant
                        .days_between_waterings
                        .map(|d| format!("every {} day{}", d, plural(i64::from(d))))
                        .unwrap_or_else(|| "-".to_string())
                );
                println!("Next watering: {}", date_or_dash(plant.next_watering));
                println!("Status:        {}", plant.status_label());
                println!("Health:        {}", plant.health);
                if let Some(ref species) = plant.species {
                    println!("Species:       {}", species);
                }
                if let Some(ref photo) = plant.photo {
                    println!("Photo:         {}", photo);
                }
                if plant.undo_available {
                    println!();
                    println!("Run `plant water {}` again today to undo.", plant.id);
                }
            }
            OutputFormat::Json => {
                println!("{}", to_json(plant));
            }
            OutputFormat::Quiet => {
                println!(
                    "{}",
                    plant.status.map(|s| s.as_str()).unwrap_or("unknown")
                );
            }
        }
    }

    /// Print a list of plants
    pub fn print_plants(&self, plants: &[PlantView]) {
        match self.format {
            OutputFormat::Human => {
                if plants.is_empty() {
                    println!("No plants found.");
                    return;
                }
                for plant in plants {
                    println!(
                        "{:<20} | next {} | {}",
                        truncate(&plant.name, 20),
                        date_or_dash(plant.next_watering),
                        plant.status_label()
                    );
                }
                let needing_water = plants
                    .iter()
                    .filter(|p| p.status.is_some_and(|s| s.needs_water()))
                    .count();
                println!(
                    "\n{} plant(s), {} need water",
                    plants.len(),
                    needing_water
                );
            }
            OutputFormat::Json => {
                println!("{}", to_json(&plants));
            }
            OutputFormat::Quiet => {
                for plant in plants {
                    println!("{}", plant.id);
                }
            }
        }
    }

    /// Print what a press of the watering toggle did
    pub fn print_toggle(&self, plant_id: &str, outcome: ToggleOutcome) {
        let message = match outcome {
            ToggleOutcome::Watered => format!("Marked {} as watered", plant_id),
            ToggleOutcome::Undone => format!("Undid today's watering of {}", plant_id),
            ToggleOutcome::Rewatered => format!("Marked {} as watered again", plant_id),
            ToggleOutcome::Uninitialized => format!("{} has no record yet; nothing changed", plant_id),
        };

        match self.format {
            OutputFormat::Human => {
                let mark = if outcome == ToggleOutcome::Uninitialized {
                    "!"
                } else {
                    "✓"
                };
                println!("{} {}", mark, message);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "id": plant_id,
                        "outcome": format!("{:?}", outcome).to_lowercase(),
                        "message": message
                    })
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a recovery hint for a failed command to stderr
    pub fn error_hint(&self, err: &anyhow::Error) {
        let Some(hint) = recovery_hint(err) else {
            return;
        };
        match self.format {
            OutputFormat::Human => eprintln!("Hint: {}", hint),
            OutputFormat::Json => eprintln!("{}", serde_json::json!({"hint": hint})),
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// What the user can do about a failed command, when storage says
pub fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        let storage = match cause.downcast_ref::<PlantError>() {
            Some(PlantError::Storage(storage)) => Some(storage),
            _ => cause.downcast_ref::<StorageError>(),
        };
        storage.and_then(StorageError::recovery_suggestion)
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn date_or_dash(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
