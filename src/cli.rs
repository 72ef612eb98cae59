//! CLI Handling module

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    VlanScopeError,
    analysis::{Analysis, DeviceSummary, DiffusionReport, LinkReport, LinkSummary},
    config::{AppConfig, ViewOptions},
    snapshot::Snapshot,
    vlans::VlanCatalog,
    web::web_server_command,
};

/// vlanscope - LLDP topology and VLAN coherence checker
#[derive(Parser)]
#[command(name = "vlanscope")]
#[command(about = "Inspect links and VLAN diffusion in an LLDP discovery snapshot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Enable debug logging (shows per-interface matching decisions)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to the configuration file
    #[arg(
        short = 'c',
        long = "config",
        default_value = "vlanscope.json",
        global = true
    )]
    config_path: PathBuf,

    /// Snapshot to analyse, overrides the configured path
    #[arg(short = 's', long = "snapshot", global = true)]
    snapshot_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List links between devices (default behavior)
    Links {
        /// Classify every link against this VLAN
        #[arg(long)]
        vlan: Option<String>,
    },
    /// List the VLANs seen anywhere in the snapshot
    Vlans,
    /// Show one device, by identifier or system name
    Device {
        device: String,
        /// Include virtual machines hosted on the device
        #[arg(long)]
        show_vms: bool,
    },
    /// Check reachability and VLAN coherence between two devices
    Check {
        from: String,
        to: String,
        #[arg(long)]
        vlan: Option<String>,
    },
    /// Show how a VLAN spreads over every link
    Diffusion { vlan: String },
    /// Start the HTTP API
    Web {
        /// Port to bind the web server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the web server to
        #[arg(short, long)]
        address: Option<String>,
    },
}

fn load_config(config_path: &Path) -> Result<AppConfig, VlanScopeError> {
    match AppConfig::load_from_file(config_path) {
        Ok(config) => Ok(config),
        Err(err) => {
            if config_path.exists() {
                Err(VlanScopeError::Config(format!(
                    "Config file '{}' exists but cannot be loaded: {err}",
                    config_path.display()
                )))
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

pub async fn main_func() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let cli = Cli::parse();

    let config_path = &cli.config_path;
    let config_result = load_config(config_path);

    let env_filter_str = if cli.debug { "debug" } else { "info" };
    let extra_filter = config_result
        .as_ref()
        .ok()
        .and_then(|config| config.log_filter.clone());
    let env_filter = match extra_filter {
        Some(extra) => EnvFilter::new(format!("{env_filter_str},{extra}")),
        None => EnvFilter::new(env_filter_str),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(cli.debug)
                .with_thread_ids(false)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    let mut app_config = match config_result {
        Ok(config) => {
            if config_path.exists() {
                info!("Loaded configuration from {}", config_path.display());
            } else {
                debug!(
                    "Config file '{}' not found, using defaults",
                    config_path.display()
                );
            }
            config
        }
        Err(err) => {
            error!("{err}");
            error!("Please check the file for JSON syntax errors or permission issues.");
            return Err(err.into());
        }
    };
    if let Some(snapshot_path) = cli.snapshot_path {
        app_config.snapshot_path = snapshot_path;
    }

    match cli.command.unwrap_or(Commands::Links { vlan: None }) {
        Commands::Web { port, address } => {
            let address = address.unwrap_or_else(|| app_config.web_address.clone());
            let port = port.unwrap_or(app_config.web_port);
            tokio::select! {
                Ok(()) = tokio::signal::ctrl_c() => {
                    info!("Quitting...");
                }
                result = web_server_command(&app_config, &address, port) => {
                    result?;
                }
            }
        }
        command => {
            let snapshot = Snapshot::load_from_file(&app_config.snapshot_path)?;
            let analysis = Analysis::new(snapshot, 1);
            let lines = run_report_command(&analysis, &app_config, command)?;
            for line in lines {
                println!("{line}");
            }
        }
    }

    Ok(())
}

fn run_report_command(
    analysis: &Analysis,
    app_config: &AppConfig,
    command: Commands,
) -> Result<Vec<String>, VlanScopeError> {
    match command {
        Commands::Links { vlan } => {
            let options = app_config.view_options(vlan, false);
            Ok(render_links(&analysis.links(&options), &options))
        }
        Commands::Vlans => Ok(render_vlans(analysis.catalog())),
        Commands::Device { device, show_vms } => {
            let identifier = resolve_device(analysis, &device)?;
            let options = app_config.view_options(None, show_vms);
            Ok(render_device(&analysis.device_summary(&identifier, &options)?))
        }
        Commands::Check { from, to, vlan } => {
            let from = resolve_device(analysis, &from)?;
            let to = resolve_device(analysis, &to)?;
            let options = app_config.view_options(vlan, false);
            Ok(render_link_report(
                &analysis.link_report(&from, &to, &options)?,
            ))
        }
        Commands::Diffusion { vlan } => {
            let report = analysis.diffusion(&vlan)?;
            let names: Vec<(String, String)> = report
                .links
                .iter()
                .map(|edge| {
                    (
                        display_name(analysis, &edge.key.a),
                        display_name(analysis, &edge.key.b),
                    )
                })
                .collect();
            Ok(render_diffusion(&report, &names))
        }
        Commands::Web { .. } => Err(VlanScopeError::Generic(
            "the web command is not a report".to_string(),
        )),
    }
}

/// Accepts an identifier or, failing that, a unique system name
fn resolve_device(analysis: &Analysis, query: &str) -> Result<String, VlanScopeError> {
    let directory = analysis.directory();
    if directory.contains(query) {
        return Ok(query.to_string());
    }
    let matches: Vec<&str> = directory
        .iter()
        .filter(|device| device.system_name == query)
        .map(|device| device.mac_address.as_str())
        .collect();
    match matches.as_slice() {
        [identifier] => Ok(identifier.to_string()),
        [] => Err(VlanScopeError::NotFound(format!("device '{query}'"))),
        _ => Err(VlanScopeError::Generic(format!(
            "'{query}' names {} devices, use an identifier",
            matches.len()
        ))),
    }
}

fn display_name(analysis: &Analysis, identifier: &str) -> String {
    analysis
        .directory()
        .get(identifier)
        .map(|device| device.display_name().to_string())
        .unwrap_or_else(|| identifier.to_string())
}

/// Left-aligned columns sized to the widest cell, separated by two spaces
fn format_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            std::cmp::max(
                header.chars().count(),
                rows.iter()
                    .map(|row| row.get(column).map_or(0, |cell| cell.chars().count()))
                    .max()
                    .unwrap_or(0),
            )
        })
        .collect();

    let format_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(headers.to_vec())];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines
}

fn render_links(links: &[LinkSummary], options: &ViewOptions) -> Vec<String> {
    if links.is_empty() {
        return vec!["No links found".to_string()];
    }
    let mut lines = vec![format!("{} link(s):", links.len()), String::new()];

    let rows: Vec<Vec<String>> = links
        .iter()
        .map(|link| {
            let mut row = vec![
                link.a_name.clone(),
                link.b_name.clone(),
                link.tuple_count.to_string(),
            ];
            if let Some(state) = link.vlan_state {
                row.push(state.to_string());
            }
            row.push(link.labels.join("; "));
            row
        })
        .collect();

    let headers: Vec<&str> = match options.vlan {
        Some(ref vlan) => {
            lines[0] = format!("{} link(s), VLAN {vlan}:", links.len());
            vec!["Device A", "Device B", "Tuples", "State", "Labels"]
        }
        None => vec!["Device A", "Device B", "Tuples", "Labels"],
    };
    lines.extend(format_table(&headers, &rows));
    lines
}

fn render_vlans(catalog: &VlanCatalog) -> Vec<String> {
    if catalog.is_empty() {
        return vec!["No VLANs found".to_string()];
    }
    let rows: Vec<Vec<String>> = catalog
        .sorted()
        .into_iter()
        .map(|vlan| vec![vlan.identifier.clone(), vlan.name.clone()])
        .collect();
    format_table(&["VLAN", "Name"], &rows)
}

fn render_device(summary: &DeviceSummary) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", summary.name, summary.identifier),
        format!("  {}: {}", summary.ip_address_type, summary.ip_address),
    ];
    if !summary.description.is_empty() {
        lines.push(format!("  Description: {}", summary.description));
    }
    if !summary.capabilities.is_empty() {
        lines.push(format!("  Capabilities: {}", summary.capabilities));
    }
    if summary.unaccessible {
        lines.push("  ⚠️ Device is unaccessible".to_string());
    }
    lines.push(format!("  Interfaces: {}", summary.interface_count));
    for port in &summary.connected_ports {
        lines.push(format!(
            "    {} --> {} ({})",
            port.local_port, port.remote_port, port.remote_system_name
        ));
    }
    if summary.other_connections > 0 {
        lines.push(format!(
            "    + {} other connection(s)",
            summary.other_connections
        ));
    }
    if !summary.virtual_machines.is_empty() {
        lines.push(format!(
            "  Virtual machines: {}",
            summary.virtual_machines.len()
        ));
        for vm in &summary.virtual_machines {
            match vm.state {
                Some(ref state) => lines.push(format!("    {} [{state}]", vm.name)),
                None => lines.push(format!("    {}", vm.name)),
            }
        }
    }
    lines
}

fn vlan_list(vlans: &[crate::Vlan]) -> String {
    vlans
        .iter()
        .map(|vlan| vlan.identifier.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn render_link_report(report: &LinkReport) -> Vec<String> {
    let mut lines = vec![format!("{} <-> {}", report.from_name, report.to_name)];
    if report.incoherences.is_empty() {
        lines.push("✅ No reachability incoherence".to_string());
    } else {
        for incoherence in &report.incoherences {
            lines.push(format!("❌ {incoherence}"));
        }
    }
    for label in &report.labels {
        lines.push(format!("  {label}"));
    }
    if let (Some(vlan), Some(state)) = (&report.vlan, report.vlan_state) {
        lines.push(format!("VLAN {vlan}: {state}"));
    }
    if report.tuples.is_empty() {
        return lines;
    }

    lines.push(String::new());
    let rows: Vec<Vec<String>> = report
        .tuples
        .iter()
        .map(|tuple| {
            vec![
                tuple.local_port.clone(),
                tuple.remote_port.clone(),
                vlan_list(&tuple.local_vlans),
                vlan_list(&tuple.remote_vlans),
                tuple.differences.join(","),
                tuple
                    .vlan_state
                    .map(|state| state.to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    lines.extend(format_table(
        &[
            report.from_name.as_str(),
            report.to_name.as_str(),
            "Local VLANs",
            "Remote VLANs",
            "Differences",
            "State",
        ],
        &rows,
    ));
    lines
}

fn render_diffusion(report: &DiffusionReport, names: &[(String, String)]) -> Vec<String> {
    let mut lines = vec![
        format!(
            "VLAN {} ({}): {} coherent, {} incoherent link(s)",
            report.vlan.identifier, report.vlan.name, report.coherent, report.incoherent
        ),
        String::new(),
    ];
    let rows: Vec<Vec<String>> = report
        .links
        .iter()
        .zip(names)
        .map(|(edge, (a, b))| vec![a.clone(), b.clone(), edge.state.to_string()])
        .collect();
    lines.extend(format_table(&["Device A", "Device B", "State"], &rows));
    lines
}
