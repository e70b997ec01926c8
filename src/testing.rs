//! Test doubles shared by the binary's unit tests

use anyhow::Result;
use hostkit::{CommandTransport, Host};
use pipeline::TransportFactory;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Transport answering from canned outputs and journaling what it was sent
#[derive(Clone, Default)]
pub struct FakeDevice {
    host: Option<String>,
    responses: BTreeMap<String, String>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, output: &str) -> Self {
        self.responses.insert(command.to_string(), output.to_string());
        self
    }

    /// Everything sent so far, across every clone of this device
    pub fn sent(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Factory handing each host a clone sharing this device's journal
    ///
    /// Journal entries are prefixed with the host name.
    pub fn factory(&self) -> TransportFactory {
        let template = self.clone();
        Arc::new(move |host: &Host| -> Result<Box<dyn CommandTransport>> {
            let mut device = template.clone();
            device.host = Some(host.name().to_string());
            Ok(Box::new(device))
        })
    }

    fn record(&self, entry: String) {
        let entry = match &self.host {
            Some(host) => format!("{host}: {entry}"),
            None => entry,
        };
        self.journal.lock().unwrap().push(entry);
    }
}

impl CommandTransport for FakeDevice {
    fn send_command(&mut self, command: &str) -> Result<String> {
        self.record(command.to_string());
        Ok(self.responses.get(command).cloned().unwrap_or_default())
    }

    fn send_config(&mut self, commands: &[String]) -> Result<String> {
        self.record(format!("config: {}", commands.join(" | ")));
        Ok(String::new())
    }

    fn save_config(&mut self) -> Result<String> {
        self.record("save".to_string());
        Ok("[OK]".to_string())
    }
}

/// Inventory of hosts carrying every built-in extension
///
/// Hosts named `nop-*` get no platform.
pub fn fleet(names: &[&str]) -> hostkit::Inventory {
    let defaults = Arc::new(hostkit::Defaults::default());
    let builtins: Vec<String> = crate::extensions::BUILTIN
        .iter()
        .map(|n| (*n).to_string())
        .collect();
    let factories = crate::extensions::factories(&builtins).unwrap();

    let hosts = names
        .iter()
        .map(|name| {
            let mut host = Host::new(*name, Arc::clone(&defaults));
            if !name.starts_with("nop-") {
                host.platform = Some("ios".to_string());
            }
            host.attach_extensions(&factories);
            ((*name).to_string(), host)
        })
        .collect();
    hostkit::Inventory::new(hosts, hostkit::GroupMap::new(), defaults)
}

/// Worker pool talking to `device`
pub fn pool(device: &FakeDevice) -> pipeline::WorkerPool {
    pipeline::WorkerPool::new(4, device.factory())
}
