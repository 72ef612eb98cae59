use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::VlanScopeError;

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("devices.json")
}

fn default_web_address() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Snapshot written by the discovery tool
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_web_address")]
    pub web_address: String,
    #[serde(default = "default_web_port")]
    pub web_port: u16,
    /// Extra tracing directives, e.g. "tower_http=debug"
    #[serde(default)]
    pub log_filter: Option<String>,
    /// VLAN used by queries that don't name one
    #[serde(default)]
    pub default_vlan: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            web_address: default_web_address(),
            web_port: default_web_port(),
            log_filter: None,
            default_vlan: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, VlanScopeError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|err| VlanScopeError::Config(err.to_string()))?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), VlanScopeError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// View options for a query, falling back to the configured default VLAN
    pub fn view_options(&self, vlan: Option<String>, show_virtual_machines: bool) -> ViewOptions {
        ViewOptions {
            vlan: vlan.or_else(|| self.default_vlan.clone()),
            show_virtual_machines,
        }
    }
}

/// Presentation choices passed along with each query instead of being kept as session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// VLAN to evaluate links against
    #[serde(default)]
    pub vlan: Option<String>,
    #[serde(default)]
    pub show_virtual_machines: bool,
}
