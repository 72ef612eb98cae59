//! Snapshot-wide VLAN catalog

use std::collections::HashMap;

use tracing::debug;

use crate::{Device, Vlan, ordering::vlan_id_cmp};

/// Every distinct VLAN seen in a snapshot.
///
/// The first record observed for an identifier is kept; later records with the
/// same identifier are dropped even if their name or mode differs.
#[derive(Debug, Clone, Default)]
pub struct VlanCatalog {
    vlans: Vec<Vlan>,
    index: HashMap<String, usize>,
}

impl VlanCatalog {
    pub fn collect<'a>(devices: impl IntoIterator<Item = &'a Device>) -> Self {
        let mut catalog = Self::default();
        for device in devices {
            for interface in device.interfaces.values() {
                for vlan in interface.vlans.values() {
                    catalog.observe(vlan);
                }
            }
        }
        debug!("Collected {} distinct VLANs", catalog.vlans.len());
        catalog
    }

    fn observe(&mut self, vlan: &Vlan) {
        if let Some(position) = self.index.get(&vlan.identifier) {
            if self.vlans[*position].name != vlan.name {
                debug!(
                    "VLAN {} already known as '{}', ignoring name '{}'",
                    vlan.identifier, self.vlans[*position].name, vlan.name
                );
            }
            return;
        }
        self.index
            .insert(vlan.identifier.clone(), self.vlans.len());
        self.vlans.push(vlan.clone());
    }

    pub fn get(&self, identifier: &str) -> Option<&Vlan> {
        self.index
            .get(identifier)
            .and_then(|position| self.vlans.get(*position))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// VLANs in the order they were first observed
    pub fn iter(&self) -> impl Iterator<Item = &Vlan> {
        self.vlans.iter()
    }

    /// VLANs ascending by identifier, for VLAN selectors
    pub fn sorted(&self) -> Vec<&Vlan> {
        let mut vlans: Vec<&Vlan> = self.vlans.iter().collect();
        vlans.sort_by(|a, b| vlan_id_cmp(&a.identifier, &b.identifier));
        vlans
    }

    pub fn len(&self) -> usize {
        self.vlans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vlans.is_empty()
    }
}
