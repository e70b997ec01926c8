//! Inventory sources and inventory-level proposals

use anyhow::Result;
use hostkit::{Data, Host, Inventory, InventoryLoader};
use serde::Serialize;
use std::fmt;

/// Where a run gets its hosts from
pub trait InventorySource: Send + Sync {
    /// Build a fresh inventory
    fn inventory(&self) -> Result<Inventory>;

    /// Describe the inventory-level state this source would produce
    fn propose_inventory(&self, inventory: &Inventory) -> Result<InventoryProposal>;
}

/// Resolved view of one host, without secrets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposedHost {
    pub name: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub platform: Option<String>,
    pub groups: Vec<String>,
    pub extensions: Vec<String>,
    pub data: Data,
}

impl ProposedHost {
    pub fn from_host(host: &Host) -> Self {
        Self {
            name: host.name().to_string(),
            hostname: host.hostname().map(str::to_owned),
            port: host.port(),
            username: host.username().map(str::to_owned),
            platform: host.platform().map(str::to_owned),
            groups: host.group_names().into_iter().map(str::to_owned).collect(),
            extensions: host.extensions().names().map(str::to_owned).collect(),
            data: host.resolved_data(),
        }
    }
}

/// Advisory description of what an inventory source resolves to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryProposal {
    pub source: String,
    pub groups: Vec<String>,
    pub hosts: Vec<ProposedHost>,
}

impl InventoryProposal {
    pub fn from_inventory(source: impl Into<String>, inventory: &Inventory) -> Self {
        Self {
            source: source.into(),
            groups: inventory.groups.keys().cloned().collect(),
            hosts: inventory.hosts.values().map(ProposedHost::from_host).collect(),
        }
    }
}

impl fmt::Display for InventoryProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} hosts, {} groups",
            self.source,
            self.hosts.len(),
            self.groups.len()
        )?;
        for host in &self.hosts {
            writeln!(
                f,
                "  {} hostname={} port={} platform={} username={} groups=[{}]",
                host.name,
                host.hostname.as_deref().unwrap_or("-"),
                host.port.map_or_else(|| "-".to_string(), |p| p.to_string()),
                host.platform.as_deref().unwrap_or("-"),
                host.username.as_deref().unwrap_or("-"),
                host.groups.join(",")
            )?;
        }
        Ok(())
    }
}

impl InventorySource for InventoryLoader {
    fn inventory(&self) -> Result<Inventory> {
        Ok(self.load()?)
    }

    fn propose_inventory(&self, inventory: &Inventory) -> Result<InventoryProposal> {
        Ok(InventoryProposal::from_inventory(self.describe(), inventory))
    }
}
