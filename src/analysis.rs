//! Per-snapshot analysis and the reports built from it
//!
//! An [`Analysis`] is computed once for a snapshot and never mutated. The
//! [`SnapshotStore`] hands out `Arc<Analysis>` values and swaps in a complete new
//! one on reload, so a query started against one version only ever sees that
//! version.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    Device, Vlan, VlanScopeError, VirtualMachine,
    config::ViewOptions,
    directory::DeviceDirectory,
    incoherence::{
        EdgeDiffusion, Incoherence, VlanState, edge_vlan_state, reachability_incoherences,
        vlan_differences, vlan_diffusion, vlan_state,
    },
    matching::InterfaceTuple,
    ordering::natural_cmp,
    snapshot::Snapshot,
    topology::{Link, LinkKey, Topology},
    vlans::VlanCatalog,
};

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub version: u64,
    pub generated_at: Option<DateTime<Utc>>,
    pub loaded_at: DateTime<Utc>,
    pub device_count: usize,
    pub link_count: usize,
    pub vlan_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ConnectedPort {
    pub local_port: String,
    pub remote_port: String,
    pub remote_system_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct DeviceSummary {
    pub identifier: String,
    pub name: String,
    pub description: String,
    pub ip_address: String,
    pub ip_address_type: String,
    pub capabilities: String,
    pub unaccessible: bool,
    pub interface_count: usize,
    /// Ports with a recognized LLDP neighbor, natural-sorted
    pub connected_ports: Vec<ConnectedPort>,
    /// Ports whose neighbor isn't a recognized LLDP speaker
    pub other_connections: usize,
    /// Only filled when virtual machines were requested
    pub virtual_machines: Vec<VirtualMachine>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct LinkSummary {
    pub key: LinkKey,
    pub a_name: String,
    pub b_name: String,
    pub labels: Vec<String>,
    pub tuple_count: usize,
    /// State of the requested VLAN on this link, if one was requested
    pub vlan_state: Option<VlanState>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct TupleReport {
    pub local_port: String,
    pub remote_port: String,
    pub local_vlans: Vec<Vlan>,
    pub remote_vlans: Vec<Vlan>,
    /// VLANs configured on only one of the two ports
    pub differences: Vec<String>,
    pub vlan_state: Option<VlanState>,
}

/// Everything known about the relationship between two devices, seen from `from`.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct LinkReport {
    pub from: String,
    pub to: String,
    pub from_name: String,
    pub to_name: String,
    pub incoherences: Vec<Incoherence>,
    pub labels: Vec<String>,
    pub tuples: Vec<TupleReport>,
    pub vlan: Option<String>,
    pub vlan_state: Option<VlanState>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct DiffusionReport {
    pub vlan: Vlan,
    pub links: Vec<EdgeDiffusion>,
    pub coherent: usize,
    pub incoherent: usize,
}

#[derive(Debug)]
pub struct Analysis {
    version: u64,
    generated_at: Option<DateTime<Utc>>,
    loaded_at: DateTime<Utc>,
    directory: DeviceDirectory,
    topology: Topology,
    catalog: VlanCatalog,
}

impl Analysis {
    pub fn new(snapshot: Snapshot, version: u64) -> Self {
        Self {
            version,
            ..Self::build(snapshot)
        }
    }

    /// Builds everything but the version, which the store assigns on install
    fn build(snapshot: Snapshot) -> Self {
        let directory = DeviceDirectory::new(snapshot.devices);
        let topology = Topology::build(&directory);
        let catalog = VlanCatalog::collect(directory.iter());
        info!(
            "Analysis built: {} device(s), {} link(s), {} VLAN(s)",
            directory.len(),
            topology.len(),
            catalog.len()
        );
        Self {
            version: 0,
            generated_at: snapshot.generated_at,
            loaded_at: Utc::now(),
            directory,
            topology,
            catalog,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn catalog(&self) -> &VlanCatalog {
        &self.catalog
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            version: self.version,
            generated_at: self.generated_at,
            loaded_at: self.loaded_at,
            device_count: self.directory.len(),
            link_count: self.topology.len(),
            vlan_count: self.catalog.len(),
        }
    }

    fn device(&self, identifier: &str) -> Result<&Device, VlanScopeError> {
        self.directory
            .get(identifier)
            .ok_or_else(|| VlanScopeError::NotFound(format!("device '{identifier}'")))
    }

    pub fn device_summary(
        &self,
        identifier: &str,
        options: &ViewOptions,
    ) -> Result<DeviceSummary, VlanScopeError> {
        let device = self.device(identifier)?;

        let mut interfaces: Vec<_> = device.interfaces.values().collect();
        interfaces.sort_by(|a, b| natural_cmp(&a.local_port, &b.local_port));

        let connected_ports = interfaces
            .iter()
            .filter(|interface| interface.is_recognized_neighbor())
            .map(|interface| ConnectedPort {
                local_port: interface.local_port.clone(),
                remote_port: interface.remote_port.clone(),
                remote_system_name: interface.remote_system_name.clone(),
            })
            .collect();
        let other_connections = interfaces
            .iter()
            .filter(|interface| !interface.is_recognized_neighbor())
            .count();

        let virtual_machines = if options.show_virtual_machines {
            let mut vms = device.virtual_machines.clone();
            vms.sort_by(|a, b| natural_cmp(&a.name, &b.name));
            vms
        } else {
            Vec::new()
        };

        Ok(DeviceSummary {
            identifier: device.mac_address.clone(),
            name: device.display_name().to_string(),
            description: device.system_description.clone(),
            ip_address: device
                .ip_address
                .clone()
                .filter(|ip| !ip.is_empty())
                .unwrap_or_else(|| "?".to_string()),
            ip_address_type: device
                .ip_address_type
                .as_deref()
                .filter(|kind| !kind.is_empty())
                .map(str::to_uppercase)
                .unwrap_or_else(|| "IP".to_string()),
            capabilities: device.enabled_capabilities.clone().unwrap_or_default(),
            unaccessible: device.is_unaccessible(),
            interface_count: device.interfaces.len(),
            connected_ports,
            other_connections,
            virtual_machines,
        })
    }

    fn link_summary(&self, link: &Link, vlan: Option<&str>) -> LinkSummary {
        let name = |identifier: &str| {
            self.directory
                .get(identifier)
                .map(|device| device.display_name().to_string())
                .unwrap_or_else(|| identifier.to_string())
        };
        LinkSummary {
            key: link.key.clone(),
            a_name: name(&link.key.a),
            b_name: name(&link.key.b),
            labels: link.labels(&self.directory),
            tuple_count: link.tuples.len(),
            vlan_state: vlan.map(|vlan| edge_vlan_state(link, vlan)),
        }
    }

    /// All links in key order, optionally classified against the view's VLAN
    pub fn links(&self, options: &ViewOptions) -> Vec<LinkSummary> {
        self.topology
            .links()
            .map(|link| self.link_summary(link, options.vlan.as_deref()))
            .collect()
    }

    pub fn link_report(
        &self,
        from: &str,
        to: &str,
        options: &ViewOptions,
    ) -> Result<LinkReport, VlanScopeError> {
        let from_device = self.device(from)?;
        let to_device = self.device(to)?;
        let vlan = options.vlan.as_deref();

        let mut incoherences = reachability_incoherences(from_device, to_device);
        let link = self.topology.link(from, to);

        let tuples: Vec<InterfaceTuple> = link
            .map(|link| link.tuples_from(from))
            .unwrap_or_default();
        if incoherences.is_empty() && tuples.is_empty() {
            incoherences.push(Incoherence::NoInterfacesFound);
        }
        debug!(
            "Link report {} -> {}: {} incoherence(s), {} tuple(s)",
            from_device.display_name(),
            to_device.display_name(),
            incoherences.len(),
            tuples.len()
        );

        let tuple_reports = tuples
            .iter()
            .map(|tuple| TupleReport {
                local_port: tuple.a.local_port.clone(),
                remote_port: tuple.b.local_port.clone(),
                local_vlans: sorted_vlans(&tuple.a.vlans),
                remote_vlans: sorted_vlans(&tuple.b.vlans),
                differences: vlan_differences(tuple),
                vlan_state: vlan.map(|vlan| vlan_state(tuple, vlan)),
            })
            .collect();

        Ok(LinkReport {
            from: from_device.mac_address.clone(),
            to: to_device.mac_address.clone(),
            from_name: from_device.display_name().to_string(),
            to_name: to_device.display_name().to_string(),
            incoherences,
            labels: link
                .map(|link| link.labels(&self.directory))
                .unwrap_or_default(),
            tuples: tuple_reports,
            vlan: vlan.map(str::to_string),
            vlan_state: match (link, vlan) {
                (Some(link), Some(vlan)) => Some(edge_vlan_state(link, vlan)),
                _ => None,
            },
        })
    }

    pub fn diffusion(&self, vlan_id: &str) -> Result<DiffusionReport, VlanScopeError> {
        let vlan = self
            .catalog
            .get(vlan_id)
            .cloned()
            .ok_or_else(|| VlanScopeError::NotFound(format!("VLAN '{vlan_id}'")))?;
        let links = vlan_diffusion(&self.topology, vlan_id);
        let coherent = links
            .iter()
            .filter(|edge| edge.state == VlanState::Coherent)
            .count();
        let incoherent = links
            .iter()
            .filter(|edge| edge.state == VlanState::Incoherent)
            .count();
        Ok(DiffusionReport {
            vlan,
            links,
            coherent,
            incoherent,
        })
    }
}

fn sorted_vlans(vlans: &std::collections::BTreeMap<String, Vlan>) -> Vec<Vlan> {
    let mut sorted: Vec<Vlan> = vlans.values().cloned().collect();
    sorted.sort_by(|a, b| crate::ordering::vlan_id_cmp(&a.identifier, &b.identifier));
    sorted
}

/// Current analysis plus the path it can be reloaded from.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    current: RwLock<Arc<Analysis>>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, snapshot: Snapshot) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(Analysis::new(snapshot, 1))),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VlanScopeError> {
        let snapshot = Snapshot::load_from_file(path.as_ref())?;
        Ok(Self::new(path.as_ref(), snapshot))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Arc<Analysis> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Installs a new snapshot under the next version number.
    ///
    /// The analysis is built outside the lock; the version is assigned while the
    /// write lock is held, so the installed version only ever grows and the last
    /// install is always the one being served.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Analysis> {
        let mut analysis = Analysis::build(snapshot);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        analysis.version = guard.version + 1;
        let analysis = Arc::new(analysis);
        *guard = Arc::clone(&analysis);
        info!("Installed analysis v{}", analysis.version);
        analysis
    }

    /// Re-reads the snapshot file. On failure the current analysis stays in place.
    pub fn reload(&self) -> Result<Arc<Analysis>, VlanScopeError> {
        let snapshot = Snapshot::load_from_file(&self.path)?;
        Ok(self.replace(snapshot))
    }
}
