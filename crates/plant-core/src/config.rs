//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/plant/config.toml)
//! 3. Environment variables (PLANT_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::clock::{parse_utc_offset, LocalZone};
use crate::schedule::is_valid_interval;

/// Environment variable prefix
const ENV_PREFIX: &str = "PLANT";

/// Interval used when a plant is added without one
const DEFAULT_INTERVAL_DAYS: u32 = 7;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the device document
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Offset (`±HH:MM`) used for "today"; the host zone when unset
    #[serde(default)]
    pub utc_offset: Option<String>,

    /// Days between waterings for newly added plants
    #[serde(default = "default_interval_days")]
    pub default_interval_days: u32,

    /// Log file path (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            utc_offset: None,
            default_interval_days: DEFAULT_INTERVAL_DAYS,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PLANT_DATA_DIR, PLANT_UTC_OFFSET,
    ///    PLANT_DEFAULT_INTERVAL)
    /// 2. Config file (~/.config/plant/config.toml or PLANT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // PLANT_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // PLANT_UTC_OFFSET
        if let Ok(val) = std::env::var(format!("{}_UTC_OFFSET", ENV_PREFIX)) {
            self.utc_offset = if val.is_empty() { None } else { Some(val) };
        }

        // PLANT_DEFAULT_INTERVAL (ignored when not a number)
        if let Ok(val) = std::env::var(format!("{}_DEFAULT_INTERVAL", ENV_PREFIX)) {
            if let Ok(days) = val.trim().parse() {
                self.default_interval_days = days;
            }
        }
    }

    /// Reject values that would only fail later
    fn validate(&self) -> Result<()> {
        self.zone()?;
        if !is_valid_interval(self.default_interval_days) {
            bail!(
                "default_interval_days must be between 1 and 60, got {}",
                self.default_interval_days
            );
        }
        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// The zone "today" is computed in
    pub fn zone(&self) -> Result<LocalZone> {
        match self.utc_offset.as_deref() {
            None => Ok(LocalZone::Host),
            Some(raw) => match parse_utc_offset(raw) {
                Some(offset) => Ok(LocalZone::Fixed(offset)),
                None => bail!("Invalid utc_offset '{}': expected ±HH:MM", raw),
            },
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PLANT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plant")
            .join("config.toml")
    }

    /// Get the path to the device document
    pub fn document_path(&self) -> PathBuf {
        self.data_dir.join("devices.json")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plant")
}

fn default_interval_days() -> u32 {
    DEFAULT_INTERVAL_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "PLANT_DATA_DIR",
        "PLANT_UTC_OFFSET",
        "PLANT_DEFAULT_INTERVAL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.utc_offset.is_none());
        assert_eq!(config.default_interval_days, 7);
        assert!(config.data_dir.ends_with("plant"));
        assert_eq!(config.zone().unwrap(), LocalZone::Host);
    }

    #[test]
    fn test_document_path() {
        let config = Config::default();
        assert!(config.document_path().ends_with("devices.json"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PLANT_DATA_DIR", "/tmp/plant-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/plant-test"));
    }

    #[test]
    fn test_env_override_utc_offset() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PLANT_UTC_OFFSET", "+01:00");
        config.apply_env_overrides();
        assert_eq!(config.utc_offset.as_deref(), Some("+01:00"));
        assert!(matches!(config.zone().unwrap(), LocalZone::Fixed(_)));

        // Empty string clears it
        env::set_var("PLANT_UTC_OFFSET", "");
        config.apply_env_overrides();
        assert!(config.utc_offset.is_none());
    }

    #[test]
    fn test_env_override_default_interval() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PLANT_DEFAULT_INTERVAL", "3");
        config.apply_env_overrides();
        assert_eq!(config.default_interval_days, 3);

        env::set_var("PLANT_DEFAULT_INTERVAL", "often");
        config.apply_env_overrides();
        assert_eq!(config.default_interval_days, 3);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            utc_offset = "-05:00"
            default_interval_days = 10
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.default_interval_days, 10);
        match config.zone().unwrap() {
            LocalZone::Fixed(offset) => assert_eq!(offset.local_minus_utc(), -5 * 3600),
            LocalZone::Host => panic!("expected a fixed offset"),
        }
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let _guard = EnvGuard::new(ENV_VARS);

        assert!(Config::load_from_str(r#"utc_offset = "noon""#).is_err());
        assert!(Config::load_from_str("default_interval_days = 0").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            utc_offset: Some("+02:00".to_string()),
            default_interval_days: 5,
            log_file: None,
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.utc_offset, config.utc_offset);
        assert_eq!(loaded.default_interval_days, 5);
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("PLANT_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.utc_offset.is_none());
        assert_eq!(config.default_interval_days, 7);
    }
}
