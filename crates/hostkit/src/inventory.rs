//! Inventory - the resolved host set of one load

use crate::groups::GroupMap;
use crate::host::Host;
use crate::model::Defaults;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Hosts keyed by name, with the groups and defaults they resolve against
#[derive(Debug, Default)]
pub struct Inventory {
    pub hosts: BTreeMap<String, Host>,
    pub groups: GroupMap,
    pub defaults: Arc<Defaults>,
}

impl Inventory {
    pub fn new(hosts: BTreeMap<String, Host>, groups: GroupMap, defaults: Arc<Defaults>) -> Self {
        Self {
            hosts,
            groups,
            defaults,
        }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn host_mut(&mut self, name: &str) -> Option<&mut Host> {
        self.hosts.get_mut(name)
    }

    /// Host names in order
    pub fn names(&self) -> Vec<&str> {
        self.hosts.keys().map(String::as_str).collect()
    }

    /// Keep only hosts matching `predicate`; groups and defaults are kept whole
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Host) -> bool,
    {
        let hosts = self
            .hosts
            .into_iter()
            .filter(|(_, host)| predicate(host))
            .collect();
        Self {
            hosts,
            groups: self.groups,
            defaults: self.defaults,
        }
    }
}
