//! Device document handling
//!
//! The whole persisted state is one versioned JSON document mapping each
//! device id to a flat map of string keys and string values. This module owns
//! that structure and the pure transformations applied to it; reading and
//! writing it to disk lives in `storage`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Per-device key/value map
///
/// Values are always strings: dates as ISO-8601, numbers in their decimal
/// form.
pub type DeviceData = BTreeMap<String, String>;

/// Keys of the schedule fields stored for every device
pub mod keys {
    pub const NAME: &str = "name";
    pub const LAST_WATERED: &str = "last_watered";
    pub const PREVIOUS_LAST_WATERED: &str = "previous_last_watered";
    pub const DAYS_BETWEEN_WATERINGS: &str = "days_between_waterings";
    pub const HEALTH: &str = "health";
    pub const SPECIES: &str = "species";
    pub const PHOTO: &str = "photo";

    /// All schedule field keys, in display order
    pub const SCHEDULE_FIELDS: &[&str] = &[
        NAME,
        LAST_WATERED,
        PREVIOUS_LAST_WATERED,
        DAYS_BETWEEN_WATERINGS,
        HEALTH,
        SPECIES,
        PHOTO,
    ];

    /// Whether `key` is one of the built-in schedule fields
    pub fn is_schedule_field(key: &str) -> bool {
        SCHEDULE_FIELDS.contains(&key)
    }
}

/// The single document holding every device's record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDocument {
    pub version: u32,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceData>,
}

impl Default for DeviceDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceDocument {
    /// Create an empty document at the current schema version
    pub fn new() -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            devices: BTreeMap::new(),
        }
    }

    /// Get a device's map, if the device exists
    pub fn device(&self, device_id: &str) -> Option<&DeviceData> {
        self.devices.get(device_id)
    }

    /// Sorted ids of all devices
    pub fn device_ids(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    /// Merge `partial` into a device's map, creating the device if needed
    ///
    /// Keys absent from `partial` keep their current value.
    pub fn merge(&mut self, device_id: &str, partial: DeviceData) {
        self.devices
            .entry(device_id.to_string())
            .or_default()
            .extend(partial);
    }

    /// Remove a device entirely. Returns whether it existed.
    pub fn remove(&mut self, device_id: &str) -> bool {
        self.devices.remove(device_id).is_some()
    }

    /// Merge `partial` into a device's map and drop the `removed` keys
    pub fn update(&mut self, device_id: &str, partial: DeviceData, removed: &[&str]) {
        let data = self.devices.entry(device_id.to_string()).or_default();
        data.extend(partial);
        for key in removed {
            data.remove(*key);
        }
    }

    /// Move a device's record from `old_id` to `new_id`
    ///
    /// Every value ending with `old_id` has that suffix rewritten to `new_id`.
    /// Device-scoped keys (`<old_id>_*` or `*_<old_id>`) are renamed to the
    /// matching `new_id` form; schedule field keys keep their name. Nothing
    /// changes unless the outcome is [`RenameOutcome::Renamed`].
    pub fn rename(&mut self, old_id: &str, new_id: &str) -> RenameOutcome {
        if !self.devices.contains_key(old_id) {
            return RenameOutcome::NotFound;
        }
        if old_id != new_id && self.devices.contains_key(new_id) {
            return RenameOutcome::TargetExists;
        }
        let Some(data) = self.devices.remove(old_id) else {
            return RenameOutcome::NotFound;
        };

        let migrated = data
            .into_iter()
            .map(|(key, value)| {
                let key = if keys::is_schedule_field(&key) {
                    key
                } else {
                    rename_key(&key, old_id, new_id)
                };
                (key, rewrite_suffix(&value, old_id, new_id))
            })
            .collect();

        self.devices.insert(new_id.to_string(), migrated);
        RenameOutcome::Renamed
    }
}

/// What [`DeviceDocument::rename`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// No record under the old id
    NotFound,
    /// Another record already uses the new id
    TargetExists,
}

fn rename_key(key: &str, old_id: &str, new_id: &str) -> String {
    if let Some(rest) = key.strip_prefix(old_id).and_then(|r| r.strip_prefix('_')) {
        return format!("{new_id}_{rest}");
    }
    if let Some(rest) = key.strip_suffix(old_id).and_then(|r| r.strip_suffix('_')) {
        return format!("{rest}_{new_id}");
    }
    key.to_string()
}

fn rewrite_suffix(value: &str, old_id: &str, new_id: &str) -> String {
    match value.strip_suffix(old_id) {
        Some(head) if !old_id.is_empty() => format!("{head}{new_id}"),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> DeviceData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_new_document_is_empty_v1() {
        let doc = DeviceDocument::new();
        assert_eq!(doc.version, CURRENT_SCHEMA_VERSION);
        assert!(doc.devices.is_empty());
    }

    #[test]
    fn test_merge_preserves_existing_keys() {
        let mut doc = DeviceDocument::new();
        doc.merge("rose", data(&[("health", "good"), ("species", "Rosa")]));
        doc.merge("rose", data(&[("health", "poor")]));

        let rose = doc.device("rose").unwrap();
        assert_eq!(rose["health"], "poor");
        assert_eq!(rose["species"], "Rosa");
    }

    #[test]
    fn test_merge_does_not_touch_other_devices() {
        let mut doc = DeviceDocument::new();
        doc.merge("rose", data(&[("health", "good")]));
        doc.merge("fern", data(&[("health", "fair")]));

        assert_eq!(doc.device("rose").unwrap().len(), 1);
        assert_eq!(doc.device("fern").unwrap()["health"], "fair");
    }

    #[test]
    fn test_rename_migrates_prefixed_keys() {
        let mut doc = DeviceDocument::new();
        doc.merge(
            "A",
            data(&[("A_last_watered", "2024-01-01"), ("A_health", "good")]),
        );

        assert_eq!(doc.rename("A", "B"), RenameOutcome::Renamed);

        assert!(doc.device("A").is_none());
        let b = doc.device("B").unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b["B_last_watered"], "2024-01-01");
        assert_eq!(b["B_health"], "good");
    }

    #[test]
    fn test_rename_migrates_suffixed_keys_and_values() {
        let mut doc = DeviceDocument::new();
        doc.merge(
            "rose",
            data(&[
                ("select_health_rose", "excellent"),
                ("last_watered", "2024-01-01T00:00:00+00:00"),
                ("linked_entity", "date.simple_plant_last_watered_rose"),
            ]),
        );

        doc.rename("rose", "tulip");

        let tulip = doc.device("tulip").unwrap();
        assert_eq!(tulip["select_health_tulip"], "excellent");
        assert_eq!(tulip["last_watered"], "2024-01-01T00:00:00+00:00");
        assert_eq!(
            tulip["linked_entity"],
            "date.simple_plant_last_watered_tulip"
        );
    }

    #[test]
    fn test_rename_keeps_schedule_field_keys() {
        // "last_watered" looks scoped to a device called "last"
        let mut doc = DeviceDocument::new();
        doc.merge(
            "last",
            data(&[
                ("last_watered", "2024-01-01T00:00:00+00:00"),
                ("last_note", "x"),
            ]),
        );

        doc.rename("last", "first");

        let first = doc.device("first").unwrap();
        assert_eq!(first["last_watered"], "2024-01-01T00:00:00+00:00");
        assert_eq!(first["first_note"], "x");
    }

    #[test]
    fn test_rename_rewrites_values_of_every_key() {
        let mut doc = DeviceDocument::new();
        doc.merge(
            "rose",
            data(&[
                ("species", "wild rose"),
                ("photo", "/local/simple_plant/rose"),
                ("health", "good"),
            ]),
        );

        doc.rename("rose", "tulip");

        let tulip = doc.device("tulip").unwrap();
        assert_eq!(tulip["photo"], "/local/simple_plant/tulip");
        assert_eq!(tulip["species"], "wild tulip");
        assert_eq!(tulip["health"], "good");
    }

    #[test]
    fn test_rename_refuses_existing_target() {
        let mut doc = DeviceDocument::new();
        doc.merge("rose", data(&[("health", "good")]));
        doc.merge("tulip", data(&[("days_between_waterings", "3")]));

        assert_eq!(doc.rename("rose", "tulip"), RenameOutcome::TargetExists);

        assert_eq!(doc.device("rose").unwrap()["health"], "good");
        let tulip = doc.device("tulip").unwrap();
        assert_eq!(tulip.len(), 1);
        assert_eq!(tulip["days_between_waterings"], "3");
    }

    #[test]
    fn test_rename_to_same_id() {
        let mut doc = DeviceDocument::new();
        doc.merge("rose", data(&[("health", "good")]));

        assert_eq!(doc.rename("rose", "rose"), RenameOutcome::Renamed);
        assert_eq!(doc.device("rose").unwrap()["health"], "good");
    }

    #[test]
    fn test_rename_rewrites_bare_value_suffix() {
        // Values are matched literally on the suffix, with no delimiter.
        let mut doc = DeviceDocument::new();
        doc.merge("rose", data(&[("note", "primrose")]));

        doc.rename("rose", "lily");

        assert_eq!(doc.device("lily").unwrap()["note"], "primlily");
    }

    #[test]
    fn test_rename_missing_device() {
        let mut doc = DeviceDocument::new();
        assert_eq!(doc.rename("ghost", "spirit"), RenameOutcome::NotFound);
        assert!(doc.devices.is_empty());
    }

    #[test]
    fn test_update_removes_keys() {
        let mut doc = DeviceDocument::new();
        doc.merge("rose", data(&[("health", "good"), ("species", "Rosa")]));

        doc.update("rose", data(&[("health", "poor")]), &["species", "photo"]);

        let rose = doc.device("rose").unwrap();
        assert_eq!(rose.len(), 1);
        assert_eq!(rose["health"], "poor");
    }

    #[test]
    fn test_remove() {
        let mut doc = DeviceDocument::new();
        doc.merge("rose", data(&[("health", "good")]));

        assert!(doc.remove("rose"));
        assert!(!doc.remove("rose"));
        assert!(doc.device_ids().is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut doc = DeviceDocument::new();
        doc.merge("rose", data(&[("days_between_waterings", "7")]));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["devices"]["rose"]["days_between_waterings"], "7");
    }
}
