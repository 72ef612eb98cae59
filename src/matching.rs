//! Pairing interfaces across two devices
//!
//! Each device reports its own view of a neighbor. An interface pair is only
//! trusted when both ends name each other: the remote port reported by one side
//! has to match the local port of the other, in both directions.

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::{Device, Interface, ordering::natural_cmp, ports::ports_match};

/// Two interfaces, one on each device, believed to be the ends of one cable.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct InterfaceTuple {
    pub a: Interface,
    pub b: Interface,
}

impl InterfaceTuple {
    pub fn swapped(&self) -> Self {
        Self {
            a: self.b.clone(),
            b: self.a.clone(),
        }
    }

    /// True when both sides claim each other as remote peer
    pub fn is_mutual(&self) -> bool {
        ports_match(&self.a.remote_port, &self.b.local_port)
            && ports_match(&self.b.remote_port, &self.a.local_port)
    }
}

/// Interfaces of `from` reporting `to` as their remote device, natural-sorted by local port.
pub fn interfaces_between<'a>(from: &'a Device, to: &Device) -> Vec<&'a Interface> {
    let mut interfaces: Vec<&Interface> = from
        .interfaces
        .values()
        .filter(|interface| {
            !interface.remote_mac_address.is_empty()
                && interface.remote_mac_address == to.mac_address
        })
        .collect();
    interfaces.sort_by(|left, right| natural_cmp(&left.local_port, &right.local_port));
    interfaces
}

/// Verified interface pairs between `a` and `b`, with `a`'s interface first.
pub fn tuples_between(a: &Device, b: &Device) -> Vec<InterfaceTuple> {
    let from_a = interfaces_between(a, b);
    let from_b = interfaces_between(b, a);

    let mut tuples = Vec::new();
    for interface_a in &from_a {
        for interface_b in &from_b {
            let tuple = InterfaceTuple {
                a: (*interface_a).clone(),
                b: (*interface_b).clone(),
            };
            if tuple.is_mutual() {
                tuples.push(tuple);
            } else {
                debug!(
                    "Rejected pairing {}:{} <-> {}:{} (remote ports {} / {})",
                    a.display_name(),
                    interface_a.local_port,
                    b.display_name(),
                    interface_b.local_port,
                    interface_a.remote_port,
                    interface_b.remote_port
                );
            }
        }
    }
    tuples
}
