//! Data models for plant
//!
//! Typed views over the string maps kept in the store: the plant's health
//! rating, the full record, and the input used to register a new plant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{format_timestamp, parse_timestamp, LocalZone};
use crate::document::{keys, DeviceData};
use crate::schedule::is_valid_interval;

/// Health rating of a plant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    #[default]
    Unset,
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl Health {
    pub const ALL: [Health; 6] = [
        Health::Unset,
        Health::Poor,
        Health::Fair,
        Health::Good,
        Health::VeryGood,
        Health::Excellent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Unset => "unset",
            Health::Poor => "poor",
            Health::Fair => "fair",
            Health::Good => "good",
            Health::VeryGood => "verygood",
            Health::Excellent => "excellent",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a health string is not one of the known options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHealth(pub String);

impl fmt::Display for UnknownHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown health '{}'", self.0)
    }
}

impl std::error::Error for UnknownHealth {}

impl FromStr for Health {
    type Err = UnknownHealth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        Health::ALL
            .into_iter()
            .find(|h| h.as_str() == normalized)
            .ok_or_else(|| UnknownHealth(s.to_string()))
    }
}

/// Typed snapshot of one device's stored record
///
/// Fields that are missing or unparseable in the store come back as `None`,
/// as does an interval outside 1 to 60 days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub name: Option<String>,
    pub last_watered: Option<DateTime<Utc>>,
    pub previous_last_watered: Option<DateTime<Utc>>,
    pub days_between_waterings: Option<u32>,
    pub health: Health,
    pub species: Option<String>,
    pub photo_path: Option<String>,
}

impl DeviceRecord {
    /// Build a record from the raw map
    pub fn from_data(device_id: &str, data: &DeviceData, zone: &LocalZone) -> Self {
        let text = |key: &str| data.get(key).filter(|v| !v.is_empty()).cloned();
        let instant = |key: &str| data.get(key).and_then(|v| parse_timestamp(v, zone));

        Self {
            device_id: device_id.to_string(),
            name: text(keys::NAME),
            last_watered: instant(keys::LAST_WATERED),
            previous_last_watered: instant(keys::PREVIOUS_LAST_WATERED),
            days_between_waterings: data
                .get(keys::DAYS_BETWEEN_WATERINGS)
                .and_then(|v| parse_interval(v))
                .filter(|days| is_valid_interval(*days)),
            health: data
                .get(keys::HEALTH)
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            species: text(keys::SPECIES),
            photo_path: text(keys::PHOTO),
        }
    }

    /// Display name, falling back to the device id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.device_id)
    }
}

/// Parse a stored interval
///
/// Older documents may hold the number in float form (`"7.0"`).
pub fn parse_interval(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }
    let f = s.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) {
        Some(f as u32)
    } else {
        None
    }
}

/// Everything needed to register a new plant
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSetup {
    pub name: String,
    pub last_watered: DateTime<Utc>,
    pub days_between_waterings: u32,
    pub health: Health,
    pub species: Option<String>,
    pub photo_path: Option<String>,
}

impl DeviceSetup {
    pub fn new(name: impl Into<String>, last_watered: DateTime<Utc>, days: u32) -> Self {
        Self {
            name: name.into(),
            last_watered,
            days_between_waterings: days,
            health: Health::Unset,
            species: None,
            photo_path: None,
        }
    }

    /// The initial key/value map written for this plant
    pub fn to_data(&self) -> DeviceData {
        let mut data = DeviceData::new();
        data.insert(keys::NAME.to_string(), self.name.trim().to_string());
        data.insert(
            keys::LAST_WATERED.to_string(),
            format_timestamp(self.last_watered),
        );
        data.insert(
            keys::DAYS_BETWEEN_WATERINGS.to_string(),
            self.days_between_waterings.to_string(),
        );
        data.insert(keys::HEALTH.to_string(), self.health.to_string());
        if let Some(ref species) = self.species {
            data.insert(keys::SPECIES.to_string(), species.clone());
        }
        if let Some(ref photo) = self.photo_path {
            data.insert(keys::PHOTO.to_string(), photo.clone());
        }
        data
    }
}

/// Derive the stable device id from a display name
///
/// Lower-cases, and collapses every run of whitespace or punctuation into a
/// single `_`, trimming it from both ends. `"  My  Rose! "` becomes
/// `"my_rose"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }

    slug
}
