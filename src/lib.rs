#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use utoipa::ToSchema;

pub mod analysis;
pub mod cli;
pub mod config;
pub mod directory;
pub mod incoherence;
pub mod matching;
pub mod ordering;
pub mod ports;
pub mod snapshot;
#[cfg(test)]
mod tests;
pub mod topology;
pub mod trunk;
pub mod vlans;
pub mod web;

/// VLAN membership of an interface, as reported by the device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Vlan {
    /// Identifier, usually the numeric VLAN tag ("10", "200")
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    /// Tagging mode, "Tagged" or "Untagged" on most devices
    #[serde(default)]
    pub mode: Option<String>,
    /// "Up" or "Down"
    #[serde(default)]
    pub status: Option<String>,
}

impl Vlan {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            mode: None,
            status: None,
        }
    }

    pub fn with_mode(self, mode: impl Into<String>) -> Self {
        Self {
            mode: Some(mode.into()),
            ..self
        }
    }

    pub fn with_status(self, status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..self
        }
    }
}

/// A bundle of local ports treated as one logical link.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Trunk {
    /// Group identifier, e.g. "Trk1" or "ae0"
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub trunk_type: Option<String>,
    /// Member ports, in the order the device listed them
    #[serde(default)]
    pub ports: Vec<String>,
}

impl Trunk {
    pub fn new(group: impl Into<String>, ports: Vec<String>) -> Self {
        Self {
            group: group.into(),
            name: None,
            trunk_type: None,
            ports,
        }
    }

    pub fn contains_port(&self, port: &str) -> bool {
        self.ports.iter().any(|member| member == port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VirtualMachine {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// One port of a device and what the device believes is plugged into it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Interface {
    pub local_port: String,
    /// Peer port as reported locally, possibly truncated with a trailing ".."
    #[serde(default)]
    pub remote_port: String,
    /// Identifier of the peer device, empty for edge ports
    #[serde(default, deserialize_with = "null_as_empty")]
    pub remote_mac_address: String,
    /// Empty when the neighbor isn't a recognized LLDP speaker
    #[serde(default, deserialize_with = "null_as_empty")]
    pub remote_system_name: String,
    #[serde(default, deserialize_with = "keyed_records")]
    pub vlans: BTreeMap<String, Vlan>,
}

impl Interface {
    pub fn new(
        local_port: impl Into<String>,
        remote_port: impl Into<String>,
        remote_mac_address: impl Into<String>,
        remote_system_name: impl Into<String>,
    ) -> Self {
        Self {
            local_port: local_port.into(),
            remote_port: remote_port.into(),
            remote_mac_address: remote_mac_address.into(),
            remote_system_name: remote_system_name.into(),
            vlans: BTreeMap::new(),
        }
    }

    /// Adds a VLAN unless one with the same identifier is already present.
    pub fn with_vlan(mut self, vlan: Vlan) -> Self {
        self.vlans.entry(vlan.identifier.clone()).or_insert(vlan);
        self
    }

    pub fn has_vlan(&self, identifier: &str) -> bool {
        self.vlans.contains_key(identifier)
    }

    pub fn is_recognized_neighbor(&self) -> bool {
        !self.remote_system_name.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Device {
    /// Chassis physical address, unique within a snapshot
    pub mac_address: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub system_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub system_description: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub ip_address_type: Option<String>,
    #[serde(default)]
    pub supported_capabilities: Option<String>,
    #[serde(default)]
    pub enabled_capabilities: Option<String>,
    /// Set when discovery could not query the device
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "keyed_records")]
    pub interfaces: BTreeMap<String, Interface>,
    #[serde(default, deserialize_with = "trunk_records")]
    pub trunks: Vec<Trunk>,
    #[serde(default)]
    pub virtual_machines: Vec<VirtualMachine>,
}

impl Device {
    pub fn new(mac_address: impl Into<String>, system_name: impl Into<String>) -> Self {
        Self {
            mac_address: mac_address.into(),
            system_name: system_name.into(),
            system_description: String::new(),
            ip_address: None,
            ip_address_type: None,
            supported_capabilities: None,
            enabled_capabilities: None,
            status: None,
            interfaces: BTreeMap::new(),
            trunks: Vec::new(),
            virtual_machines: Vec::new(),
        }
    }

    /// The system name, or the identifier when the device never reported one
    pub fn display_name(&self) -> &str {
        if self.system_name.is_empty() {
            &self.mac_address
        } else {
            &self.system_name
        }
    }

    /// A device is unaccessible when discovery flagged it or it reported no interfaces.
    pub fn is_unaccessible(&self) -> bool {
        self.status.is_some() || self.interfaces.is_empty()
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces
            .insert(interface.local_port.clone(), interface);
        self
    }

    pub fn with_trunk(mut self, trunk: Trunk) -> Self {
        self.trunks.push(trunk);
        self
    }

    pub fn with_virtual_machine(mut self, vm: VirtualMachine) -> Self {
        self.virtual_machines.push(vm);
        self
    }

    pub fn with_description(self, system_description: impl Into<String>) -> Self {
        Self {
            system_description: system_description.into(),
            ..self
        }
    }

    pub fn with_status(self, status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..self
        }
    }
}

/// Records that can be listed either as a JSON array or as an object keyed by this value
trait KeyedRecord {
    fn record_key(&self) -> &str;
}

impl KeyedRecord for Interface {
    fn record_key(&self) -> &str {
        &self.local_port
    }
}

impl KeyedRecord for Vlan {
    fn record_key(&self) -> &str {
        &self.identifier
    }
}

enum KeyedOrListed<T> {
    Keyed(BTreeMap<String, T>),
    Listed(Vec<T>),
}

/// Picks the form from the JSON shape, so a bad field inside a record is reported as such
fn keyed_or_listed<'de, D, T>(deserializer: D) -> Result<Option<KeyedOrListed<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map(|records| Some(KeyedOrListed::Keyed(records)))
            .map_err(D::Error::custom),
        Some(value @ Value::Array(_)) => serde_json::from_value(value)
            .map(|records| Some(KeyedOrListed::Listed(records)))
            .map_err(D::Error::custom),
        Some(other) => Err(D::Error::custom(format!(
            "expected a map or a list of records, found {other}"
        ))),
    }
}

fn keyed_records<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + KeyedRecord,
{
    match keyed_or_listed::<D, T>(deserializer)? {
        None => Ok(BTreeMap::new()),
        Some(KeyedOrListed::Keyed(records)) => Ok(records),
        Some(KeyedOrListed::Listed(records)) => {
            let mut keyed = BTreeMap::new();
            for record in records {
                // first record for a key wins, same as the discovery tool
                keyed
                    .entry(record.record_key().to_string())
                    .or_insert(record);
            }
            Ok(keyed)
        }
    }
}

fn trunk_records<'de, D>(deserializer: D) -> Result<Vec<Trunk>, D::Error>
where
    D: Deserializer<'de>,
{
    match keyed_or_listed::<D, Trunk>(deserializer)? {
        None => Ok(Vec::new()),
        Some(KeyedOrListed::Listed(trunks)) => Ok(trunks),
        Some(KeyedOrListed::Keyed(trunks)) => Ok(trunks
            .into_iter()
            .map(|(group, trunk)| {
                if trunk.group.is_empty() {
                    Trunk { group, ..trunk }
                } else {
                    trunk
                }
            })
            .collect()),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug)]
pub enum VlanScopeError {
    Config(String),
    Generic(String),
    InvalidSnapshot(String),
    Io(std::io::Error),
    NotFound(String),
    Serde(String),
}

impl PartialEq for VlanScopeError {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl From<std::io::Error> for VlanScopeError {
    fn from(err: std::io::Error) -> Self {
        VlanScopeError::Io(err)
    }
}

impl From<serde_json::Error> for VlanScopeError {
    fn from(err: serde_json::Error) -> Self {
        VlanScopeError::Serde(err.to_string())
    }
}

impl std::fmt::Display for VlanScopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VlanScopeError::Config(error) => write!(f, "Config error: {error}"),
            VlanScopeError::Generic(error) => write!(f, "Generic error: {error}"),
            VlanScopeError::InvalidSnapshot(error) => write!(f, "Invalid snapshot: {error}"),
            VlanScopeError::Io(error) => write!(f, "IO error: {error}"),
            VlanScopeError::NotFound(error) => write!(f, "Not found error: {error}"),
            VlanScopeError::Serde(error) => write!(f, "Serde error: {error}"),
        }
    }
}

impl std::error::Error for VlanScopeError {}

#[cfg(test)]
pub(crate) fn setup_test_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_test_writer()
                .with_level(true),
        )
        .with(tracing_subscriber::EnvFilter::new("debug"))
        .try_init();
}
