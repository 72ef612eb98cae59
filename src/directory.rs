//! Device lookup by identifier

use std::collections::HashMap;

use tracing::warn;

use crate::Device;

/// Devices of one snapshot, indexed by their identifier.
///
/// Iteration follows the snapshot order. If an identifier appears twice the
/// first device keeps the index slot; snapshots are validated against this
/// before an analysis is built.
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    devices: Vec<Device>,
    index: HashMap<String, usize>,
}

impl DeviceDirectory {
    pub fn new(devices: Vec<Device>) -> Self {
        let mut index = HashMap::with_capacity(devices.len());
        for (position, device) in devices.iter().enumerate() {
            if index.contains_key(&device.mac_address) {
                warn!(
                    "Ignoring duplicate device identifier '{}' ({})",
                    device.mac_address,
                    device.display_name()
                );
                continue;
            }
            index.insert(device.mac_address.clone(), position);
        }
        Self { devices, index }
    }

    pub fn get(&self, identifier: &str) -> Option<&Device> {
        self.index
            .get(identifier)
            .and_then(|position| self.devices.get(*position))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Devices in snapshot order
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
