//! Group resolver - turns flat group definitions into a linked graph
//!
//! Resolution is two-pass:
//! 1. instantiate every group from its own fields, remembering parent names
//! 2. link parents, depth-first, so each reference points at a finished group
//!
//! Undefined parents and inheritance cycles are rejected; no partial graph is
//! ever returned.

use crate::error::{Error, Result};
use crate::model::{
    ConnectionMap, Data, Defaults, Group, lenient_port, lenient_string, null_as_default,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A group as written in a template file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDefinition {
    #[serde(deserialize_with = "lenient_string")]
    pub hostname: Option<String>,
    #[serde(deserialize_with = "lenient_port")]
    pub port: Option<u16>,
    #[serde(deserialize_with = "lenient_string")]
    pub username: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub password: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub platform: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub data: Data,
    #[serde(deserialize_with = "null_as_default")]
    pub connection_options: ConnectionMap,
    /// Parent group names, most specific first
    #[serde(deserialize_with = "null_as_default")]
    pub groups: Vec<String>,
}

/// Resolved groups, keyed by name
pub type GroupMap = BTreeMap<String, Arc<Group>>;

struct Unlinked {
    group: Group,
    parents: Vec<String>,
}

/// Build the linked group graph from definitions and the load's defaults
pub fn resolve_groups(
    definitions: &BTreeMap<String, GroupDefinition>,
    defaults: &Arc<Defaults>,
) -> Result<GroupMap> {
    // Pass 1: own fields only, parents by name
    let mut unlinked: BTreeMap<String, Unlinked> = BTreeMap::new();
    for (name, def) in definitions {
        if let Some(parent) = def.groups.iter().find(|p| !definitions.contains_key(*p)) {
            return Err(Error::UnknownParentGroup {
                group: name.clone(),
                parent: parent.clone(),
            });
        }

        let mut group = Group::new(name.clone(), Arc::clone(defaults));
        group.hostname = def.hostname.clone();
        group.port = def.port;
        group.username = def.username.clone();
        group.password = def.password.clone();
        group.platform = def.platform.clone();
        group.data = def.data.clone();
        group.connection_options = def.connection_options.clone();

        unlinked.insert(
            name.clone(),
            Unlinked {
                group,
                parents: def.groups.clone(),
            },
        );
    }

    // Pass 2: replace parent names with resolved references
    let mut linked = GroupMap::new();
    let mut stack = Vec::new();
    for name in definitions.keys() {
        link(name, &mut unlinked, &mut linked, &mut stack)?;
    }

    debug!("resolved {} groups", linked.len());
    Ok(linked)
}

fn link(
    name: &str,
    unlinked: &mut BTreeMap<String, Unlinked>,
    linked: &mut GroupMap,
    stack: &mut Vec<String>,
) -> Result<Arc<Group>> {
    if let Some(group) = linked.get(name) {
        return Ok(Arc::clone(group));
    }

    if let Some(start) = stack.iter().position(|n| n == name) {
        let mut path = stack[start..].to_vec();
        path.push(name.to_string());
        return Err(Error::GroupCycle { path });
    }

    let Some(Unlinked { mut group, parents }) = unlinked.remove(name) else {
        // Names are validated in pass 1, so only a caller bug lands here
        return Err(Error::UnknownParentGroup {
            group: stack.last().cloned().unwrap_or_default(),
            parent: name.to_string(),
        });
    };

    stack.push(name.to_string());
    for parent in &parents {
        let resolved = link(parent, unlinked, linked, stack)?;
        group.parents.push(resolved);
    }
    stack.pop();

    let group = Arc::new(group);
    linked.insert(name.to_string(), Arc::clone(&group));
    Ok(group)
}
