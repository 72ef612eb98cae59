//! Trunk group lookup

use crate::Device;

/// Label for the trunk that `port` belongs to on `device`, e.g. `"Trk1 (A1, A2)"`.
///
/// Membership is an exact match on the member port name. When a port is
/// (wrongly) listed in several trunks the first declared one wins. `None` tells
/// the caller to label the interface on its own.
pub fn resolve_trunk_label(port: &str, device: &Device) -> Option<String> {
    device
        .trunks
        .iter()
        .find(|trunk| trunk.contains_port(port))
        .map(|trunk| format!("{} ({})", trunk.group, trunk.ports.join(", ")))
}
