//! Plant CLI
//!
//! Command-line interface for plant - watering schedules for house plants.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plant_core::Config;

mod commands;
mod output;

use commands::plant::{AddOptions, PlantField};
use commands::Garden;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "plant")]
#[command(about = "Plant - keep track of when your plants need water")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a plant
    Add {
        /// Display name (the id is derived from it)
        name: String,
        /// When it was last watered (YYYY-MM-DD, RFC 3339, today, yesterday)
        #[arg(long, short = 'w')]
        last_watered: Option<String>,
        /// Days between waterings (1-60)
        #[arg(long, short = 'e', visible_alias = "interval")]
        every: Option<u32>,
        /// Health (poor, fair, good, very good, excellent)
        #[arg(long)]
        health: Option<String>,
        /// Species
        #[arg(long)]
        species: Option<String>,
        /// Path to a photo
        #[arg(long)]
        photo: Option<String>,
    },
    /// List plants and their watering status (default)
    #[command(alias = "ls")]
    List {
        /// Only plants that are due or overdue
        #[arg(long)]
        due: bool,
    },
    /// Show one plant
    Show {
        /// Plant name or id
        name: String,
    },
    /// Mark a plant as watered; run again the same day to undo
    Water {
        /// Plant name or id
        name: String,
    },
    /// Set the date a plant was last watered
    SetWatered {
        /// Plant name or id
        name: String,
        /// YYYY-MM-DD, RFC 3339, today or yesterday
        date: String,
    },
    /// Change a plant's interval, health, species or photo
    Set {
        /// Plant name or id
        name: String,
        /// Field to change
        #[arg(value_enum)]
        field: PlantField,
        /// New value
        value: String,
    },
    /// Rename a plant
    #[command(alias = "mv")]
    Rename {
        /// Current name or id
        name: String,
        /// New display name
        new_name: String,
    },
    /// Remove a plant and its stored record
    #[command(alias = "rm")]
    Remove {
        /// Plant name or id
        name: String,
    },
    /// Keep running and reprint status on every change and at midnight
    Watch,
    /// Show or modify configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, utc_offset, default_interval_days, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the current config is broken
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config)?;

    let garden = Garden::open(config)?;

    let result = match cli.command.unwrap_or(Commands::List { due: false }) {
        Commands::Add {
            name,
            last_watered,
            every,
            health,
            species,
            photo,
        } => {
            let options = AddOptions {
                last_watered,
                every,
                health,
                species,
                photo,
            };
            commands::plant::add(&garden, name, options, &output)
        }
        Commands::List { due } => commands::plant::list(&garden, due, &output),
        Commands::Show { name } => commands::plant::show(&garden, &name, &output),
        Commands::Water { name } => commands::plant::water(&garden, &name, &output),
        Commands::SetWatered { name, date } => {
            commands::plant::set_watered(&garden, &name, &date, &output)
        }
        Commands::Set { name, field, value } => {
            commands::plant::set(&garden, &name, field, &value, &output)
        }
        Commands::Rename { name, new_name } => {
            commands::plant::rename(&garden, &name, &new_name, &output)
        }
        Commands::Remove { name } => commands::plant::remove(&garden, &name, &output),
        Commands::Watch => commands::watch::run(&garden, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    if let Err(ref err) = result {
        output.error_hint(err);
    }
    result
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only active when PLANT_LOG is set (e.g. `PLANT_LOG=debug`). Logs go to
/// `log_file` when configured, stderr otherwise.
fn init_logging(config: &Config) -> Result<()> {
    let Ok(level) = std::env::var("PLANT_LOG") else {
        return Ok(());
    };
    let level = if level.is_empty() { "info".to_string() } else { level };
    let filter = EnvFilter::new(format!("plant_core={level},plant_cli={level}"));

    match config.log_file {
        Some(ref path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;

            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }

    Ok(())
}
