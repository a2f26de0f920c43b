//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use plant_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "utc_offset": config.utc_offset,
                    "default_interval_days": config.default_interval_days,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.document_path().display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:              {}", config.data_dir.display());
            println!(
                "  utc_offset:            {}",
                config.utc_offset.as_deref().unwrap_or("(host zone)")
            );
            println!(
                "  default_interval_days: {}",
                config.default_interval_days
            );
            println!(
                "  log_file:              {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(stderr)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
            println!("Plants file: {}", config.document_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "utc_offset" => {
            config.utc_offset = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
            config.zone()?;
        }
        "default_interval_days" => {
            let days: u32 = value
                .parse()
                .context("Invalid value for default_interval_days. Use a number of days.")?;
            if !(1..=60).contains(&days) {
                bail!("default_interval_days must be between 1 and 60, got {}", days);
            }
            config.default_interval_days = days;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, utc_offset, default_interval_days, log_file",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "utc_offset", "+05:30").unwrap();
        assert_eq!(config.utc_offset.as_deref(), Some("+05:30"));
        apply(&mut config, "utc_offset", "none").unwrap();
        assert!(config.utc_offset.is_none());

        apply(&mut config, "default_interval_days", "14").unwrap();
        assert_eq!(config.default_interval_days, 14);

        apply(&mut config, "log_file", "/tmp/plant.log").unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/plant.log")));
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "utc_offset", "teatime").is_err());
        assert!(apply(&mut config, "default_interval_days", "0").is_err());
        assert!(apply(&mut config, "default_interval_days", "weekly").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
        assert_eq!(config.default_interval_days, 7);
    }
}
