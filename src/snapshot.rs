//! Discovery snapshot loading
//!
//! The discovery tool writes either a bare JSON array of devices or an object
//! carrying the generation timestamp next to the device list. Both are accepted.

use std::{collections::HashSet, fs, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{Device, VlanScopeError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Value")]
pub struct Snapshot {
    pub generated_at: Option<DateTime<Utc>>,
    pub devices: Vec<Device>,
}

#[derive(Deserialize)]
struct WrappedSnapshot {
    #[serde(default)]
    generated_at: Option<DateTime<Utc>>,
    devices: Vec<Device>,
}

/// The document shape decides the form, so errors inside a device keep their field name.
impl TryFrom<Value> for Snapshot {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(_) => serde_json::from_value::<Vec<Device>>(value)
                .map(Self::new)
                .map_err(|err| format!("invalid device list: {err}")),
            Value::Object(_) => serde_json::from_value::<WrappedSnapshot>(value)
                .map(|wrapped| Self {
                    generated_at: wrapped.generated_at,
                    devices: wrapped.devices,
                })
                .map_err(|err| format!("invalid snapshot object: {err}")),
            other => Err(format!(
                "expected a device array or an object with 'devices', found {other}"
            )),
        }
    }
}

impl Snapshot {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            generated_at: None,
            devices,
        }
    }

    pub fn with_generated_at(self, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at: Some(generated_at),
            ..self
        }
    }

    /// Parses and validates a snapshot document
    pub fn from_json(content: &str) -> Result<Self, VlanScopeError> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, VlanScopeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            VlanScopeError::InvalidSnapshot(format!(
                "Could not read snapshot '{}': {err}",
                path.display()
            ))
        })?;
        let snapshot = Self::from_json(&content)?;
        info!(
            "Loaded {} device(s) from {}",
            snapshot.devices.len(),
            path.display()
        );
        Ok(snapshot)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), VlanScopeError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Rejects snapshots the analysis cannot index: blank or repeated device identifiers.
    pub fn validate(&self) -> Result<(), VlanScopeError> {
        let mut seen = HashSet::with_capacity(self.devices.len());
        for (position, device) in self.devices.iter().enumerate() {
            if device.mac_address.trim().is_empty() {
                return Err(VlanScopeError::InvalidSnapshot(format!(
                    "device #{position} ({}) has an empty identifier",
                    device.display_name()
                )));
            }
            if !seen.insert(device.mac_address.as_str()) {
                return Err(VlanScopeError::InvalidSnapshot(format!(
                    "duplicate device identifier '{}' ({})",
                    device.mac_address,
                    device.display_name()
                )));
            }
        }
        debug!("Snapshot with {} device(s) is valid", self.devices.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "{}", content).expect("Failed to write to temp file");
        temp_file
    }

    #[test]
    fn test_bare_device_list() {
        let snapshot = Snapshot::from_json(
            r#"[{"mac_address": "aa", "system_name": "sw1", "interfaces": []}]"#,
        )
        .expect("bare list should parse");
        assert!(snapshot.generated_at.is_none());
        assert_eq!(snapshot.devices.len(), 1);
    }

    #[test]
    fn test_wrapped_with_timestamp() {
        let snapshot = Snapshot::from_json(
            r#"{
                "generated_at": "2015-03-20T14:30:00Z",
                "devices": [{"mac_address": "aa", "system_name": "sw1"}]
            }"#,
        )
        .expect("wrapped snapshot should parse");
        assert_eq!(
            snapshot.generated_at.map(|t| t.to_rfc3339()),
            Some("2015-03-20T14:30:00+00:00".to_string())
        );
    }

    #[test]
    fn test_duplicate_identifier_fails_fast() {
        let result = Snapshot::from_json(
            r#"[{"mac_address": "aa", "system_name": "one"},
                {"mac_address": "aa", "system_name": "two"}]"#,
        );
        match result {
            Err(VlanScopeError::InvalidSnapshot(message)) => {
                assert!(message.contains("duplicate device identifier 'aa'"))
            }
            other => panic!("expected InvalidSnapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_identifier_fails_fast() {
        let result = Snapshot::from_json(r#"[{"mac_address": "  ", "system_name": "one"}]"#);
        assert!(matches!(result, Err(VlanScopeError::InvalidSnapshot(_))));
    }

    #[test]
    fn test_field_error_inside_wrapped_snapshot_is_reported() {
        let result = Snapshot::from_json(
            r#"{"devices": [{"mac_address": "aa", "interfaces": [{"remote_port": "1"}]}]}"#,
        );
        match result {
            Err(VlanScopeError::Serde(message)) => {
                assert!(message.contains("local_port"), "{message}")
            }
            other => panic!("expected Serde error, got {other:?}"),
        }

        let result = Snapshot::from_json(r#"[{"system_name": "no identifier"}]"#);
        match result {
            Err(VlanScopeError::Serde(message)) => {
                assert!(message.contains("mac_address"), "{message}")
            }
            other => panic!("expected Serde error, got {other:?}"),
        }
    }

    #[test]
    fn test_scalar_document_is_rejected() {
        let result = Snapshot::from_json("42");
        match result {
            Err(VlanScopeError::Serde(message)) => {
                assert!(message.contains("device array"), "{message}")
            }
            other => panic!("expected Serde error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        let result = Snapshot::from_json("[{ not json");
        assert!(matches!(result, Err(VlanScopeError::Serde(_))));
    }

    #[test]
    fn test_load_and_save_roundtrip_through_file() {
        let temp_file =
            create_temp_file(r#"[{"mac_address": "aa", "system_name": "sw1", "interfaces": {}}]"#);
        let snapshot = Snapshot::load_from_file(temp_file.path()).expect("load failed");
        assert_eq!(snapshot.devices[0].display_name(), "sw1");

        let output = NamedTempFile::new().expect("Failed to create temp file");
        snapshot
            .save_to_file(output.path())
            .expect("save failed");
        let reloaded = Snapshot::load_from_file(output.path()).expect("reload failed");
        assert_eq!(reloaded, snapshot);
    }

    #[test]
    fn test_missing_file() {
        let result = Snapshot::load_from_file("/nonexistent/devices.json");
        match result {
            Err(VlanScopeError::InvalidSnapshot(message)) => {
                assert!(message.contains("/nonexistent/devices.json"))
            }
            other => panic!("expected InvalidSnapshot, got {other:?}"),
        }
    }
}
