//! Reachability and VLAN diffusion checks between devices
//!
//! Everything here is total: anomalies in the topology come back as
//! [`Incoherence`] values or as [`VlanState::NotApplicable`], never as errors.

use std::{collections::BTreeSet, fmt::Display};

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    Device,
    matching::{InterfaceTuple, interfaces_between},
    ordering::vlan_id_cmp,
    topology::{Link, LinkKey, Topology},
};

/// A mismatch between what two devices report about each other.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Incoherence {
    /// The device could not be queried or reported no interfaces
    Unaccessible { device: String },
    /// Neither device reports the other
    NoValidLink,
    /// `reporter` has no interface pointing at `other`, while `other` points back
    DoesNotRecognize { reporter: String, other: String },
    /// Both devices report each other but no interface pair is mutual.
    /// Raised by link reports, never by [`reachability_incoherences`].
    NoInterfacesFound,
}

impl Display for Incoherence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Incoherence::Unaccessible { device } => write!(f, "{device} is unaccessible"),
            Incoherence::NoValidLink => {
                write!(f, "cannot find any valid link between these two devices")
            }
            Incoherence::DoesNotRecognize { reporter, other } => {
                write!(f, "{reporter} does not recognize {other}")
            }
            Incoherence::NoInterfacesFound => {
                write!(f, "no interfaces found between these two devices")
            }
        }
    }
}

/// Reachability problems between two devices, empty when both see each other.
///
/// An unaccessible device short-circuits: only that device is reported and no
/// interface-level checks are attempted. Whether the two sides agree on actual
/// port pairs is not checked here; see [`crate::analysis::Analysis::link_report`].
pub fn reachability_incoherences(a: &Device, b: &Device) -> Vec<Incoherence> {
    for device in [a, b] {
        if device.is_unaccessible() {
            return vec![Incoherence::Unaccessible {
                device: device.display_name().to_string(),
            }];
        }
    }

    let from_a = interfaces_between(a, b);
    let from_b = interfaces_between(b, a);

    match (from_a.is_empty(), from_b.is_empty()) {
        (true, true) => vec![Incoherence::NoValidLink],
        (true, false) => vec![Incoherence::DoesNotRecognize {
            reporter: a.display_name().to_string(),
            other: b.display_name().to_string(),
        }],
        (false, true) => vec![Incoherence::DoesNotRecognize {
            reporter: b.display_name().to_string(),
            other: a.display_name().to_string(),
        }],
        (false, false) => Vec::new(),
    }
}

/// How a VLAN is configured across the two ends of a tuple or link.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VlanState {
    /// Present on both ends
    Coherent,
    /// Present on exactly one end
    Incoherent,
    /// Present on neither end
    NotApplicable,
}

impl Display for VlanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VlanState::Coherent => write!(f, "coherent"),
            VlanState::Incoherent => write!(f, "incoherent"),
            VlanState::NotApplicable => write!(f, "n/a"),
        }
    }
}

pub fn vlan_state(tuple: &InterfaceTuple, vlan_id: &str) -> VlanState {
    match (tuple.a.has_vlan(vlan_id), tuple.b.has_vlan(vlan_id)) {
        (true, true) => VlanState::Coherent,
        (true, false) | (false, true) => VlanState::Incoherent,
        (false, false) => VlanState::NotApplicable,
    }
}

/// Aggregated VLAN state over all tuples of a link.
///
/// A single incoherent tuple makes the whole link incoherent, whatever the
/// other tuples say and in whatever order they are visited.
pub fn edge_vlan_state(link: &Link, vlan_id: &str) -> VlanState {
    let mut coherent = false;
    for tuple in &link.tuples {
        match vlan_state(tuple, vlan_id) {
            VlanState::Incoherent => return VlanState::Incoherent,
            VlanState::Coherent => coherent = true,
            VlanState::NotApplicable => {}
        }
    }
    if coherent {
        VlanState::Coherent
    } else {
        VlanState::NotApplicable
    }
}

/// VLAN identifiers configured on only one end of the tuple, sorted
pub fn vlan_differences(tuple: &InterfaceTuple) -> Vec<String> {
    let a: BTreeSet<&String> = tuple.a.vlans.keys().collect();
    let b: BTreeSet<&String> = tuple.b.vlans.keys().collect();
    let mut differences: Vec<String> = a.symmetric_difference(&b).map(|id| id.to_string()).collect();
    differences.sort_by(|left, right| vlan_id_cmp(left, right));
    differences
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct EdgeDiffusion {
    pub key: LinkKey,
    pub state: VlanState,
}

/// State of one VLAN on every link of the topology, in link order
pub fn vlan_diffusion(topology: &Topology, vlan_id: &str) -> Vec<EdgeDiffusion> {
    topology
        .links()
        .map(|link| EdgeDiffusion {
            key: link.key.clone(),
            state: edge_vlan_state(link, vlan_id),
        })
        .collect()
}
