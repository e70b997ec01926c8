//! Run-wide device credentials
//!
//! Credentials from the config file override whatever the inventory
//! resolves, both on the host and in its `ssh` connection profile.

use anyhow::Result;
use hostkit::{Host, Inventory};
use pipeline::{InventoryProposal, InventorySource};

pub struct CredentialedSource {
    inner: Box<dyn InventorySource>,
    username: Option<String>,
    password: Option<String>,
}

impl CredentialedSource {
    pub fn new(
        inner: Box<dyn InventorySource>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            inner,
            username,
            password,
        }
    }

    fn apply(&self, host: &mut Host) {
        if self.username.is_none() && self.password.is_none() {
            return;
        }
        let ssh = host.connection_options.entry("ssh".to_string()).or_default();
        if let Some(username) = &self.username {
            ssh.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            ssh.password = Some(password.clone());
        }

        if let Some(username) = &self.username {
            host.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            host.password = Some(password.clone());
        }
    }
}

impl InventorySource for CredentialedSource {
    fn inventory(&self) -> Result<Inventory> {
        let mut inventory = self.inner.inventory()?;
        for host in inventory.hosts.values_mut() {
            self.apply(host);
        }
        log::debug!("applied run credentials to {} hosts", inventory.len());
        Ok(inventory)
    }

    fn propose_inventory(&self, inventory: &Inventory) -> Result<InventoryProposal> {
        self.inner.propose_inventory(inventory)
    }
}
