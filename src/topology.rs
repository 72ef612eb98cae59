//! Undirected link set built from per-device neighbor reports

use std::collections::{BTreeMap, btree_map::Entry};

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::{
    Device,
    directory::DeviceDirectory,
    matching::{InterfaceTuple, interfaces_between, tuples_between},
    trunk::resolve_trunk_label,
};

/// Unordered device pair. `a` is always the smaller identifier, so (A,B) and
/// (B,A) build the same key.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkKey {
    pub a: String,
    pub b: String,
}

impl LinkKey {
    pub fn new(first: &str, second: &str) -> Self {
        if first <= second {
            Self {
                a: first.to_string(),
                b: second.to_string(),
            }
        } else {
            Self {
                a: second.to_string(),
                b: first.to_string(),
            }
        }
    }

    pub fn involves(&self, identifier: &str) -> bool {
        self.a == identifier || self.b == identifier
    }
}

/// A connection between two devices and the interface pairs realizing it.
/// Every tuple has its `a` interface on device `key.a`.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct Link {
    pub key: LinkKey,
    pub tuples: Vec<InterfaceTuple>,
}

impl Link {
    /// Edge labels, one per tuple, with trunk members folded into their trunk label.
    ///
    /// A link without tuples is labelled from whatever its reporting interfaces
    /// claim, so one-sided or unaccessible links still show their ports.
    pub fn labels(&self, directory: &DeviceDirectory) -> Vec<String> {
        let device_a = directory.get(&self.key.a);
        let device_b = directory.get(&self.key.b);

        // (port on b, port on a)
        let pairs: Vec<(&str, &str)> = if !self.tuples.is_empty() {
            self.tuples
                .iter()
                .map(|tuple| (tuple.b.local_port.as_str(), tuple.a.local_port.as_str()))
                .collect()
        } else if let (Some(a), Some(b)) = (device_a, device_b) {
            let from_a = interfaces_between(a, b)
                .into_iter()
                .map(|interface| (interface.remote_port.as_str(), interface.local_port.as_str()));
            let from_b = interfaces_between(b, a)
                .into_iter()
                .map(|interface| (interface.local_port.as_str(), interface.remote_port.as_str()));
            from_a.chain(from_b).collect()
        } else {
            Vec::new()
        };

        let mut labels: Vec<String> = Vec::new();
        for (port_b, port_a) in pairs {
            let label = format!(
                "{} -> {}",
                port_label(port_b, device_b),
                port_label(port_a, device_a)
            );
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }

    /// Tuples oriented so that the interface on `from` comes first
    pub fn tuples_from(&self, from: &str) -> Vec<InterfaceTuple> {
        if from == self.key.a {
            self.tuples.clone()
        } else {
            self.tuples.iter().map(InterfaceTuple::swapped).collect()
        }
    }
}

fn port_label(port: &str, device: Option<&Device>) -> String {
    device
        .and_then(|device| resolve_trunk_label(port, device))
        .unwrap_or_else(|| port.to_string())
}

/// Deduplicated link set of a snapshot, ordered by [`LinkKey`].
#[derive(Debug, Clone, Default)]
pub struct Topology {
    links: BTreeMap<LinkKey, Link>,
}

impl Topology {
    pub fn build(directory: &DeviceDirectory) -> Self {
        let mut links: BTreeMap<LinkKey, Link> = BTreeMap::new();
        let mut unknown_remotes = 0usize;

        for device in directory.iter() {
            for interface in device.interfaces.values() {
                let remote = interface.remote_mac_address.as_str();
                if remote.is_empty() {
                    continue;
                }
                if remote == device.mac_address {
                    debug!(
                        "Skipping self-reference on {}:{}",
                        device.display_name(),
                        interface.local_port
                    );
                    continue;
                }
                if !directory.contains(remote) {
                    debug!(
                        "{}:{} reports unknown device '{}'",
                        device.display_name(),
                        interface.local_port,
                        remote
                    );
                    unknown_remotes += 1;
                    continue;
                }

                let key = LinkKey::new(&device.mac_address, remote);
                if let Entry::Vacant(entry) = links.entry(key.clone()) {
                    entry.insert(Link {
                        key,
                        tuples: Vec::new(),
                    });
                }
            }
        }

        for link in links.values_mut() {
            if let (Some(a), Some(b)) = (directory.get(&link.key.a), directory.get(&link.key.b)) {
                link.tuples = tuples_between(a, b);
                debug!(
                    "Link {} <-> {} has {} interface pair(s)",
                    a.display_name(),
                    b.display_name(),
                    link.tuples.len()
                );
            }
        }

        if unknown_remotes > 0 {
            warn!("{unknown_remotes} interface(s) report a device missing from the snapshot");
        }
        info!(
            "Built {} link(s) between {} device(s)",
            links.len(),
            directory.len()
        );
        Self { links }
    }

    pub fn link(&self, first: &str, second: &str) -> Option<&Link> {
        self.links.get(&LinkKey::new(first, second))
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Links touching the given device
    pub fn links_of<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links
            .values()
            .filter(move |link| link.key.involves(identifier))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interface;
    use crate::tests::{CORE_ID, EDGE_ID, ESX_ID, sample_directory};

    #[test]
    fn test_link_key_is_unordered() {
        assert_eq!(LinkKey::new("aa", "bb"), LinkKey::new("bb", "aa"));
        assert_eq!(LinkKey::new("bb", "aa").a, "aa");
        assert!(LinkKey::new("aa", "bb").involves("bb"));
        assert!(!LinkKey::new("aa", "bb").involves("cc"));
    }

    #[test]
    fn test_build_links_deduplicates_pairs() {
        crate::setup_test_logging();
        let directory = sample_directory();
        let topology = Topology::build(&directory);

        // edge <-> core is reported by four interfaces, core <-> esx by one
        assert_eq!(topology.len(), 2);
        let forward = topology.link(EDGE_ID, CORE_ID).map(|l| &l.key);
        let backward = topology.link(CORE_ID, EDGE_ID).map(|l| &l.key);
        assert!(forward.is_some());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_unaccessible_device_is_still_a_link_target() {
        let directory = sample_directory();
        let topology = Topology::build(&directory);

        let link = topology.link(CORE_ID, ESX_ID);
        assert!(link.is_some());
        assert!(link.is_some_and(|l| l.tuples.is_empty()));
        assert_eq!(topology.links_of(ESX_ID).count(), 1);
        assert_eq!(topology.links_of(CORE_ID).count(), 2);
    }

    #[test]
    fn test_tuples_attached_with_key_orientation() {
        let directory = sample_directory();
        let topology = Topology::build(&directory);
        let link = topology
            .link(EDGE_ID, CORE_ID)
            .expect("edge/core link missing");

        assert_eq!(link.tuples.len(), 2);
        for tuple in &link.tuples {
            assert_eq!(tuple.a.remote_mac_address, link.key.b);
            assert_eq!(tuple.b.remote_mac_address, link.key.a);
            assert!(tuple.is_mutual());
        }

        let from_edge = link.tuples_from(EDGE_ID);
        assert!(from_edge.iter().all(|t| t.a.remote_mac_address == CORE_ID));
        let from_core = link.tuples_from(CORE_ID);
        assert!(from_core.iter().all(|t| t.a.remote_mac_address == EDGE_ID));
    }

    #[test]
    fn test_labels_fold_trunk_members() {
        let directory = sample_directory();
        let topology = Topology::build(&directory);
        let link = topology
            .link(EDGE_ID, CORE_ID)
            .expect("edge/core link missing");

        // core sorts first, so its ports are on the right-hand side
        assert_eq!(link.key.a, CORE_ID);
        assert_eq!(
            link.labels(&directory),
            vec!["Trk1 (23, 24) -> ae0 (ge-0/0/2.0, ge-0/0/10.0)".to_string()]
        );
    }

    #[test]
    fn test_labels_without_trunks() {
        let a = Device::new("aa", "a").with_interface(Interface::new("1", "7", "bb", "b"));
        let b = Device::new("bb", "b").with_interface(Interface::new("7", "1", "aa", "a"));
        let directory = DeviceDirectory::new(vec![a, b]);
        let topology = Topology::build(&directory);

        let link = topology.link("aa", "bb").expect("link missing");
        assert_eq!(link.labels(&directory), vec!["7 -> 1".to_string()]);
    }

    #[test]
    fn test_labels_of_link_without_tuples_use_reported_ports() {
        let directory = sample_directory();
        let topology = Topology::build(&directory);
        let link = topology.link(CORE_ID, ESX_ID).expect("core/esx link missing");

        assert!(link.tuples.is_empty());
        assert_eq!(link.labels(&directory), vec!["1 -> ge-0/0/5.0".to_string()]);
    }

    #[test]
    fn test_labels_of_one_sided_link() {
        let x = Device::new("X", "switch-x")
            .with_interface(Interface::new("A1", "B1", "Y", "switch-y"));
        let y = Device::new("Y", "switch-y").with_interface(Interface::new("B1", "", "", ""));
        let directory = DeviceDirectory::new(vec![x, y]);
        let topology = Topology::build(&directory);

        let link = topology.link("X", "Y").expect("link missing");
        assert!(link.tuples.is_empty());
        assert_eq!(link.labels(&directory), vec!["B1 -> A1".to_string()]);
    }

    #[test]
    fn test_self_reference_and_unknown_remote_are_skipped() {
        crate::setup_test_logging();
        let a = Device::new("aa", "a")
            .with_interface(Interface::new("1", "2", "aa", "a"))
            .with_interface(Interface::new("3", "4", "ff", "ghost"))
            .with_interface(Interface::new("5", "6", "ee", "ghost-2"));
        let directory = DeviceDirectory::new(vec![a]);
        assert!(Topology::build(&directory).is_empty());
    }

    #[test]
    fn test_build_is_idempotent() {
        let directory = sample_directory();
        let first = Topology::build(&directory);
        let second = Topology::build(&directory);
        let first_links: Vec<&Link> = first.links().collect();
        let second_links: Vec<&Link> = second.links().collect();
        assert_eq!(first_links, second_links);
    }
}
