//! Parsers for Cisco-style CLI output

use regex::Regex;
use std::sync::LazyLock;

// "21   USERS        active    Gi1/0/3, Gi1/0/4,"
static VLAN_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+\S+\s+\S+\s*(.*)$").unwrap());

// Wrapped port list under the Ports column
static VLAN_CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+(\S.*)$").unwrap());

static DOT1X_INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*Dot1x Info for (\S+)").unwrap());

static INTERFACE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z-]*?)\s*(\d.*)$").unwrap());

/// Long interface type names and their short forms, longest first
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("TwentyFiveGigabitEthernet", "Twe"),
    ("HundredGigabitEthernet", "Hu"),
    ("FortyGigabitEthernet", "Fo"),
    ("AppGigabitEthernet", "Ap"),
    ("TwoGigabitEthernet", "Tw"),
    ("TenGigabitEthernet", "Te"),
    ("FiveGigabitEthernet", "Fi"),
    ("TwentyFiveGigE", "Twe"),
    ("GigabitEthernet", "Gi"),
    ("FastEthernet", "Fa"),
    ("HundredGigE", "Hu"),
    ("Port-channel", "Po"),
    ("Ethernet", "Et"),
    ("Loopback", "Lo"),
    ("Tunnel", "Tu"),
    ("Vlan", "Vl"),
];

/// One row of `show vlan brief`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanRow {
    pub id: String,
    pub interfaces: Vec<String>,
}

/// Parse `show vlan brief`, joining wrapped port lists onto their VLAN
pub fn vlan_brief(output: &str) -> Vec<VlanRow> {
    let mut rows: Vec<VlanRow> = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() || line.starts_with("VLAN") || line.starts_with("----") {
            continue;
        }

        if let Some(caps) = VLAN_ROW.captures(line) {
            rows.push(VlanRow {
                id: caps[1].to_string(),
                interfaces: split_ports(&caps[2]),
            });
        } else if let Some(caps) = VLAN_CONTINUATION.captures(line)
            && let Some(last) = rows.last_mut()
        {
            last.interfaces.extend(split_ports(&caps[1]));
        }
    }

    rows
}

/// Interfaces assigned to `vlan`, as printed by `show vlan brief`
pub fn vlan_interfaces(output: &str, vlan: &str) -> Vec<String> {
    vlan_brief(output)
        .into_iter()
        .filter(|row| row.id == vlan)
        .flat_map(|row| row.interfaces)
        .collect()
}

fn split_ports(ports: &str) -> Vec<String> {
    ports
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Interfaces with an 802.1X section in `show dot1x all`, abbreviated
pub fn dot1x_interfaces(output: &str) -> Vec<String> {
    DOT1X_INTERFACE
        .captures_iter(output)
        .map(|caps| abbreviate_interface(&caps[1]))
        .collect()
}

/// Shorten an interface name the way IOS prints it in tables
///
/// `GigabitEthernet1/0/3` becomes `Gi1/0/3`. Names that are already short, or
/// of an unknown type, come back unchanged.
pub fn abbreviate_interface(name: &str) -> String {
    let name = name.trim();
    let Some(caps) = INTERFACE_NAME.captures(name) else {
        return name.to_string();
    };
    let kind = &caps[1];
    let number = &caps[2];

    ABBREVIATIONS
        .iter()
        .find(|(long, _)| long.eq_ignore_ascii_case(kind))
        .map_or_else(
            || name.to_string(),
            |(_, short)| format!("{short}{number}"),
        )
}
