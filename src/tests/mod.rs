
use chrono::{TimeZone, Utc};

use crate::{
    analysis::Analysis,
    config::ViewOptions,
    directory::DeviceDirectory,
    incoherence::{Incoherence, VlanState, edge_vlan_state, reachability_incoherences},
    snapshot::Snapshot,
    topology::Topology,
    vlans::VlanCatalog,
    *,
};

pub(crate) const EDGE_ID: &str = "00 1b 3f 11 22 33";
pub(crate) const CORE_ID: &str = "00 05 85 aa bb cc";
pub(crate) const ESX_ID: &str = "00 0c 29 de ad 00";

fn vlan(identifier: &str) -> Vlan {
    let name = match identifier {
        "10" => "users",
        "20" => "servers",
        "30" => "voice",
        "40" => "mgmt",
        _ => "other",
    };
    Vlan::new(identifier, name)
        .with_mode("Tagged")
        .with_status("Up")
}

/// Access switch with a two-port trunk towards the core and a truncated remote port name on 23
pub(crate) fn procurve_edge() -> Device {
    let mut device = Device::new(EDGE_ID, "sw-hp-1")
        .with_description("ProCurve J9086A Switch 2610-24/12PWR")
        .with_interface(
            Interface::new("23", "ge-0/0..", CORE_ID, "ex-core")
                .with_vlan(vlan("10"))
                .with_vlan(vlan("20")),
        )
        .with_interface(
            Interface::new("24", "ge-0/0/10.0", CORE_ID, "ex-core")
                .with_vlan(vlan("10"))
                .with_vlan(vlan("30")),
        )
        .with_interface(Interface::new("1", "", "", ""))
        .with_trunk(Trunk::new("Trk1", vec!["23".to_string(), "24".to_string()]));
    device.ip_address = Some("10.0.0.2".to_string());
    device.ip_address_type = Some("ipv4".to_string());
    device.enabled_capabilities = Some("bridge".to_string());
    device
}

pub(crate) fn juniper_core() -> Device {
    let mut device = Device::new(CORE_ID, "ex-core")
        .with_description("Juniper Networks EX4200")
        .with_interface(
            Interface::new("ge-0/0/2.0", "23", EDGE_ID, "sw-hp-1")
                .with_vlan(vlan("10"))
                .with_vlan(vlan("20")),
        )
        .with_interface(Interface::new("ge-0/0/10.0", "24", EDGE_ID, "sw-hp-1").with_vlan(vlan("10")))
        .with_interface(
            Interface::new("ge-0/0/5.0", "1", ESX_ID, "esx-1")
                .with_vlan(vlan("20"))
                .with_vlan(vlan("40")),
        )
        .with_trunk(Trunk::new(
            "ae0",
            vec!["ge-0/0/2.0".to_string(), "ge-0/0/10.0".to_string()],
        ));
    device.ip_address = Some("10.0.0.1".to_string());
    device.ip_address_type = Some("ipv4".to_string());
    device.enabled_capabilities = Some("bridge, router".to_string());
    device
}

/// Hypervisor that answers LLDP but could not be queried for its interfaces
pub(crate) fn esx_host() -> Device {
    Device::new(ESX_ID, "esx-1")
        .with_virtual_machine(VirtualMachine {
            identifier: "vm-10".to_string(),
            name: "vm10".to_string(),
            state: Some("poweredOn".to_string()),
        })
        .with_virtual_machine(VirtualMachine {
            identifier: "vm-2".to_string(),
            name: "vm2".to_string(),
            state: Some("poweredOff".to_string()),
        })
}

pub(crate) fn sample_directory() -> DeviceDirectory {
    DeviceDirectory::new(vec![procurve_edge(), juniper_core(), esx_host()])
}

pub(crate) fn sample_snapshot() -> Snapshot {
    let generated_at = Utc
        .with_ymd_and_hms(2015, 3, 20, 14, 30, 0)
        .single()
        .expect("valid timestamp");
    Snapshot::new(vec![procurve_edge(), juniper_core(), esx_host()]).with_generated_at(generated_at)
}

/// Two switches, one cable, VLAN 10 on both ends, 20 only on X and 30 on neither
fn two_switches() -> DeviceDirectory {
    let x = Device::new("X", "switch-x").with_interface(
        Interface::new("A1", "B1", "Y", "switch-y")
            .with_vlan(vlan("10"))
            .with_vlan(vlan("20")),
    );
    let y = Device::new("Y", "switch-y")
        .with_interface(Interface::new("B1", "A1", "X", "switch-x").with_vlan(vlan("10")));
    DeviceDirectory::new(vec![x, y])
}

#[test]
fn test_two_switch_vlan_states() {
    crate::setup_test_logging();
    let directory = two_switches();
    let topology = Topology::build(&directory);

    assert_eq!(topology.len(), 1);
    let link = topology.link("X", "Y").expect("link missing");
    assert_eq!(link.tuples.len(), 1);

    assert_eq!(edge_vlan_state(link, "10"), VlanState::Coherent);
    assert_eq!(edge_vlan_state(link, "20"), VlanState::Incoherent);
    assert_eq!(edge_vlan_state(link, "30"), VlanState::NotApplicable);
}

#[test]
fn test_reachability_is_symmetric_for_the_sample() {
    let json = serde_json::to_string(&sample_snapshot()).expect("serialize");
    let parsed = Snapshot::from_json(&json).expect("parse");
    let directory = DeviceDirectory::new(parsed.devices);
    let esx_unaccessible = vec![Incoherence::Unaccessible {
        device: "esx-1".to_string(),
    }];

    for (a, b, expected) in [
        (EDGE_ID, CORE_ID, Vec::new()),
        (EDGE_ID, ESX_ID, esx_unaccessible.clone()),
        (CORE_ID, ESX_ID, esx_unaccessible.clone()),
    ] {
        let (Some(da), Some(db)) = (directory.get(a), directory.get(b)) else {
            panic!("fixture device missing");
        };
        assert_eq!(reachability_incoherences(da, db), expected, "{a} / {b}");
        assert_eq!(reachability_incoherences(db, da), expected, "{b} / {a}");
    }
}

#[test]
fn test_one_sided_report_is_symmetric_after_parsing() {
    let parsed = Snapshot::from_json(
        r#"[
            {"mac_address": "X", "system_name": "switch-x", "interfaces": [
                {"local_port": "A1", "remote_port": "B1", "remote_mac_address": "Y"}
            ]},
            {"mac_address": "Y", "system_name": "switch-y", "interfaces": [
                {"local_port": "B1"}
            ]}
        ]"#,
    )
    .expect("parse");
    let directory = DeviceDirectory::new(parsed.devices);
    let (Some(x), Some(y)) = (directory.get("X"), directory.get("Y")) else {
        panic!("fixture device missing");
    };

    let expected = vec![Incoherence::DoesNotRecognize {
        reporter: "switch-y".to_string(),
        other: "switch-x".to_string(),
    }];
    assert_eq!(reachability_incoherences(x, y), expected);
    assert_eq!(reachability_incoherences(y, x), expected);
}

#[test]
fn test_one_sided_report_builds_link_without_tuples() {
    let x = Device::new("X", "switch-x").with_interface(Interface::new("A1", "B1", "Y", "switch-y"));
    let y = Device::new("Y", "switch-y").with_interface(Interface::new("B1", "", "", ""));
    let directory = DeviceDirectory::new(vec![x, y]);
    let topology = Topology::build(&directory);

    let link = topology.link("Y", "X").expect("link missing");
    assert!(link.tuples.is_empty());

    let (Some(x), Some(y)) = (directory.get("X"), directory.get("Y")) else {
        panic!("fixture device missing");
    };
    assert_eq!(
        reachability_incoherences(x, y),
        vec![Incoherence::DoesNotRecognize {
            reporter: "switch-y".to_string(),
            other: "switch-x".to_string(),
        }]
    );
}

#[test]
fn test_catalog_over_sample_keeps_first_name() {
    let mut core = juniper_core();
    core.interfaces
        .entry("ge-0/0/2.0".to_string())
        .and_modify(|interface| {
            interface.vlans.insert("10".to_string(), Vlan::new("10", "renamed"));
        });
    let directory = DeviceDirectory::new(vec![procurve_edge(), core]);
    let catalog = VlanCatalog::collect(directory.iter());

    assert_eq!(catalog.get("10").map(|v| v.name.as_str()), Some("users"));
    let ids: Vec<&str> = catalog.sorted().iter().map(|v| v.identifier.as_str()).collect();
    assert_eq!(ids, vec!["10", "20", "30", "40"]);
}

#[test]
fn test_parsed_snapshot_matches_fixture_analysis() {
    let json = serde_json::to_string(&sample_snapshot()).expect("serialize");
    let parsed = Snapshot::from_json(&json).expect("parse");
    let analysis = Analysis::new(parsed, 1);

    let report = analysis
        .link_report(
            CORE_ID,
            EDGE_ID,
            &ViewOptions {
                vlan: Some("20".to_string()),
                show_virtual_machines: false,
            },
        )
        .expect("report");
    assert!(report.incoherences.is_empty());
    assert_eq!(report.tuples.len(), 2);
    assert_eq!(report.tuples[0].local_port, "ge-0/0/2.0");
    assert_eq!(report.vlan_state, Some(VlanState::Coherent));
}
