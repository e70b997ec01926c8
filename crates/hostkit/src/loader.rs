//! Inventory loader - raw records in, resolved hosts out
//!
//! Each fetched record goes through:
//! 1. the configured transformations, in order
//! 2. reserved field extraction (`name`, `groups`, `hostname`, `port`,
//!    `username`, `password`, `platform`, `connection_options`)
//! 3. group lookup, with unknown names becoming empty placeholder groups
//! 4. host construction, where leftover fields become host data and the
//!    extension factories populate the host's registry
//!
//! Any failure aborts the whole load; no partial inventory is returned.

use crate::error::{Error, Result};
use crate::extension::ExtensionFactory;
use crate::groups::{GroupDefinition, GroupMap, resolve_groups};
use crate::host::Host;
use crate::inventory::Inventory;
use crate::model::{
    ConnectionMap, ConnectionOptions, Defaults, Group, Record, port_number, scalar_text,
};
use crate::source::{DocumentSource, Query};
use crate::transform::Transform;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What to do when two records resolve to the same host name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateHosts {
    /// Keep the later record, logging a warning
    #[default]
    Overwrite,
    /// Fail the load
    Reject,
}

/// Builds an [`Inventory`] from a document source
pub struct InventoryLoader {
    source: Box<dyn DocumentSource>,
    database: String,
    collection: String,
    query: Query,
    transforms: Vec<Transform>,
    extensions: Vec<ExtensionFactory>,
    groups: GroupMap,
    defaults: Arc<Defaults>,
    duplicates: DuplicateHosts,
}

impl InventoryLoader {
    pub fn new(
        source: Box<dyn DocumentSource>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            source,
            database: database.into(),
            collection: collection.into(),
            query: Query::all(),
            transforms: Vec::new(),
            extensions: Vec::new(),
            groups: GroupMap::new(),
            defaults: Arc::new(Defaults::default()),
            duplicates: DuplicateHosts::default(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Append a record transformation
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Append an extension factory; later names replace earlier ones per host
    #[must_use]
    pub fn with_extension(mut self, factory: ExtensionFactory) -> Self {
        self.extensions.push(factory);
        self
    }

    /// Set defaults and resolve the group templates against them
    pub fn with_templates(
        mut self,
        defaults: Defaults,
        groups: &BTreeMap<String, GroupDefinition>,
    ) -> Result<Self> {
        let defaults = Arc::new(defaults);
        self.groups = resolve_groups(groups, &defaults)?;
        self.defaults = defaults;
        Ok(self)
    }

    #[must_use]
    pub fn with_duplicates(mut self, policy: DuplicateHosts) -> Self {
        self.duplicates = policy;
        self
    }

    /// One-line description of where hosts come from
    pub fn describe(&self) -> String {
        format!(
            "{} {}/{}",
            self.source.describe(),
            self.database,
            self.collection
        )
    }

    /// Fetch, transform and resolve every matching record
    pub fn load(&self) -> Result<Inventory> {
        let records = self
            .source
            .fetch(&self.database, &self.collection, &self.query)?;
        debug!("fetched {} records from {}", records.len(), self.describe());

        let mut hosts: BTreeMap<String, Host> = BTreeMap::new();
        for (index, record) in records.into_iter().enumerate() {
            let host = self.build_host(index, record)?;
            let name = host.name().to_string();
            if hosts.contains_key(&name) {
                match self.duplicates {
                    DuplicateHosts::Reject => return Err(Error::DuplicateHost(name)),
                    DuplicateHosts::Overwrite => {
                        warn!("duplicate host '{name}' (record #{index}) replaces an earlier record");
                    }
                }
            }
            hosts.insert(name, host);
        }

        info!(
            "loaded {} hosts and {} groups from {}",
            hosts.len(),
            self.groups.len(),
            self.describe()
        );
        Ok(Inventory::new(
            hosts,
            self.groups.clone(),
            Arc::clone(&self.defaults),
        ))
    }

    fn build_host(&self, index: usize, mut record: Record) -> Result<Host> {
        for transform in &self.transforms {
            record = transform(record)?;
        }

        let name = match record.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            _ => return Err(Error::MissingName { index }),
        };

        let mut host = Host::new(name.clone(), Arc::clone(&self.defaults));
        host.groups = self.lookup_groups(&group_names(&name, record.remove("groups"))?);
        host.hostname = string_field(&name, "hostname", record.remove("hostname"))?;
        host.username = string_field(&name, "username", record.remove("username"))?;
        host.password = string_field(&name, "password", record.remove("password"))?;
        host.platform = string_field(&name, "platform", record.remove("platform"))?;
        host.port = port_field(&name, record.remove("port"))?;
        host.connection_options =
            connection_options_field(&name, record.remove("connection_options"))?;
        host.data = record;

        host.attach_extensions(&self.extensions);
        Ok(host)
    }

    fn lookup_groups(&self, names: &[String]) -> Vec<Arc<Group>> {
        names
            .iter()
            .map(|name| match self.groups.get(name) {
                Some(group) => Arc::clone(group),
                None => {
                    debug!("group '{name}' is not defined, using an empty placeholder");
                    Arc::new(Group::placeholder(name.clone(), Arc::clone(&self.defaults)))
                }
            })
            .collect()
    }
}

fn invalid(host: &str, field: &str, reason: impl Into<String>) -> Error {
    Error::InvalidField {
        host: host.to_string(),
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Comma-joined string or array of names, trimmed, empty entries dropped
fn group_names(host: &str, value: Option<Value>) -> Result<Vec<String>> {
    let raw: Vec<String> = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(invalid(host, "groups", format!("expected group name, got {other}"))),
            })
            .collect::<Result<_>>()?,
        Some(other) => {
            return Err(invalid(
                host,
                "groups",
                format!("expected comma-separated names, got {other}"),
            ));
        }
    };

    Ok(raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Empty strings and null are unset, numbers are stringified
fn string_field(host: &str, field: &str, value: Option<Value>) -> Result<Option<String>> {
    value
        .map_or(Ok(None), scalar_text)
        .map_err(|reason| invalid(host, field, reason))
}

fn port_field(host: &str, value: Option<Value>) -> Result<Option<u16>> {
    value
        .map_or(Ok(None), port_number)
        .map_err(|reason| invalid(host, "port", reason))
}

fn connection_options_field(host: &str, value: Option<Value>) -> Result<ConnectionMap> {
    let map = match value {
        None | Some(Value::Null) => return Ok(ConnectionMap::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(invalid(
                host,
                "connection_options",
                format!("expected a mapping of profiles, got {other}"),
            ));
        }
    };

    map.into_iter()
        .map(|(method, profile)| {
            if !profile.is_object() {
                return Err(invalid(
                    host,
                    "connection_options",
                    format!("profile '{method}' must be a mapping"),
                ));
            }
            let options: ConnectionOptions = serde_json::from_value(profile).map_err(|e| {
                invalid(host, "connection_options", format!("profile '{method}': {e}"))
            })?;
            Ok((method, options))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{Extension, ExtensionCall};
    use crate::source::MemoryDocumentSource;
    use crate::transform::FieldTransform;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn loader(records: Vec<Value>) -> InventoryLoader {
        let source = MemoryDocumentSource::new().with_collection(
            "network_inventory",
            "devices",
            records.into_iter().map(record).collect(),
        );
        InventoryLoader::new(Box::new(source), "network_inventory", "devices")
    }

    fn access_templates() -> (Defaults, BTreeMap<String, GroupDefinition>) {
        let defaults = Defaults {
            username: Some("admin".into()),
            ..Default::default()
        };
        let mut groups = BTreeMap::new();
        groups.insert(
            "access".to_string(),
            GroupDefinition {
                platform: Some("ios".into()),
                ..Default::default()
            },
        );
        (defaults, groups)
    }

    #[test]
    fn test_group_and_defaults_scenario() {
        let (defaults, groups) = access_templates();
        let inventory = loader(vec![json!({"name": "sw1", "groups": "access", "platform": ""})])
            .with_templates(defaults, &groups)
            .unwrap()
            .load()
            .unwrap();

        let sw1 = inventory.host("sw1").unwrap();
        assert_eq!(sw1.platform, None);
        assert_eq!(sw1.platform(), Some("ios"));
        assert_eq!(sw1.username(), Some("admin"));
        assert_eq!(sw1.hostname(), None);
    }

    #[test]
    fn test_empty_template_values_fall_through() {
        let defaults: Defaults =
            serde_json::from_value(json!({"platform": "eos", "username": ""})).unwrap();
        let mut groups = BTreeMap::new();
        groups.insert(
            "edge".to_string(),
            serde_json::from_value::<GroupDefinition>(
                json!({"platform": "", "port": "", "username": "netops"}),
            )
            .unwrap(),
        );
        groups.insert(
            "access".to_string(),
            serde_json::from_value::<GroupDefinition>(json!({"platform": "ios", "port": "2222"}))
                .unwrap(),
        );

        let inventory = loader(vec![
            json!({"name": "sw1", "groups": "edge,access"}),
            json!({"name": "sw2", "groups": "edge"}),
        ])
        .with_templates(defaults, &groups)
        .unwrap()
        .load()
        .unwrap();

        let sw1 = inventory.host("sw1").unwrap();
        assert_eq!(sw1.platform(), Some("ios"));
        assert_eq!(sw1.port(), Some(2222));
        assert_eq!(sw1.username(), Some("netops"));
        assert_eq!(inventory.host("sw2").unwrap().platform(), Some("eos"));
        assert_eq!(inventory.defaults.username, None);
    }

    #[test]
    fn test_connection_profile_fields_are_normalized() {
        let inventory = loader(vec![json!({
            "name": "sw1",
            "platform": "ios",
            "connection_options": {
                "ssh": {"port": "22", "platform": "", "username": 1001, "hostname": null}
            }
        })])
        .load()
        .unwrap();

        let sw1 = inventory.host("sw1").unwrap();
        let ssh = &sw1.connection_options["ssh"];
        assert_eq!(ssh.port, Some(22));
        assert_eq!(ssh.platform, None);
        assert_eq!(ssh.username.as_deref(), Some("1001"));
        assert_eq!(sw1.connection_parameters("ssh").platform.as_deref(), Some("ios"));

        let err = loader(vec![json!({
            "name": "sw1",
            "connection_options": {"ssh": {"port": "ssh"}}
        })])
        .load()
        .unwrap_err();
        assert!(err.to_string().contains("ssh is not a valid port"));
    }

    #[test]
    fn test_unknown_group_becomes_placeholder() {
        let (defaults, groups) = access_templates();
        let inventory = loader(vec![json!({"name": "sw1", "groups": "ghost, access"})])
            .with_templates(defaults, &groups)
            .unwrap()
            .load()
            .unwrap();

        let sw1 = inventory.host("sw1").unwrap();
        assert_eq!(sw1.group_names(), vec!["ghost", "access"]);
        assert!(sw1.groups[0].data.is_empty());
        assert!(sw1.groups[0].parents.is_empty());
        assert_eq!(sw1.platform(), Some("ios"));
        assert!(!inventory.groups.contains_key("ghost"));
    }

    #[test]
    fn test_zero_records_is_empty_inventory() {
        let inventory = loader(Vec::new()).load().unwrap();
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_loading_twice_is_deterministic() {
        let (defaults, groups) = access_templates();
        let loader = loader(vec![
            json!({"name": "sw1", "groups": "access", "hostname": "10.0.0.1"}),
            json!({"name": "sw2", "groups": ["ghost"], "port": "2222"}),
        ])
        .with_templates(defaults, &groups)
        .unwrap();

        let first = loader.load().unwrap();
        let second = loader.load().unwrap();
        assert_eq!(first.names(), second.names());
        for (a, b) in first.hosts.values().zip(second.hosts.values()) {
            assert_eq!(a.hostname(), b.hostname());
            assert_eq!(a.port(), b.port());
            assert_eq!(a.username(), b.username());
            assert_eq!(a.platform(), b.platform());
            assert_eq!(a.group_names(), b.group_names());
            assert_eq!(a.resolved_data(), b.resolved_data());
        }
    }

    #[test]
    fn test_reserved_fields_and_data() {
        let inventory = loader(vec![json!({
            "name": "sw1",
            "groups": "a,, b ,",
            "hostname": "",
            "port": 830,
            "platform": "eos",
            "site": "hq",
            "connection_options": {"ssh": {"username": "svc", "extras": {"fast_cli": false}}}
        })])
        .load()
        .unwrap();

        let sw1 = inventory.host("sw1").unwrap();
        assert_eq!(sw1.group_names(), vec!["a", "b"]);
        assert_eq!(sw1.hostname, None);
        assert_eq!(sw1.port, Some(830));
        assert_eq!(sw1.platform(), Some("eos"));
        assert_eq!(sw1.data.get("site"), Some(&json!("hq")));
        assert!(!sw1.data.contains_key("name"));
        assert!(!sw1.data.contains_key("connection_options"));
        assert_eq!(
            sw1.connection_options["ssh"].username.as_deref(),
            Some("svc")
        );
    }

    #[test]
    fn test_missing_name_aborts_load() {
        let err = loader(vec![json!({"name": "sw1"}), json!({"hostname": "10.0.0.2"})])
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::MissingName { index: 1 }));
    }

    #[test]
    fn test_transform_can_remove_name() {
        let err = loader(vec![json!({"name": "sw1"})])
            .with_transform(Box::new(|mut r: Record| -> Result<Record> {
                r.remove("name");
                Ok(r)
            }))
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::MissingName { index: 0 }));
    }

    #[test]
    fn test_transforms_run_in_order() {
        let inventory = loader(vec![json!({"hostname_raw": "SW1.EXAMPLE", "name": "sw1"})])
            .with_transform(
                FieldTransform::Rename {
                    from: "hostname_raw".into(),
                    to: "hostname".into(),
                }
                .into_transform(),
            )
            .with_transform(FieldTransform::Lowercase { field: "hostname".into() }.into_transform())
            .load()
            .unwrap();

        assert_eq!(inventory.host("sw1").unwrap().hostname(), Some("sw1.example"));
    }

    #[test]
    fn test_invalid_port_and_connection_options() {
        let err = loader(vec![json!({"name": "sw1", "port": "ssh"})])
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidField { ref field, .. } if field == "port"));

        let err = loader(vec![json!({"name": "sw1", "port": 70000})])
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidField { ref field, .. } if field == "port"));

        let err = loader(vec![json!({"name": "sw1", "connection_options": {"ssh": 1}})])
            .load()
            .unwrap_err();
        assert!(
            matches!(err, Error::InvalidField { ref field, .. } if field == "connection_options")
        );
    }

    #[test]
    fn test_duplicate_policy() {
        let records = vec![
            json!({"name": "sw1", "hostname": "10.0.0.1"}),
            json!({"name": "sw1", "hostname": "10.0.0.2"}),
        ];

        let inventory = loader(records.clone()).load().unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.host("sw1").unwrap().hostname(), Some("10.0.0.2"));

        let err = loader(records)
            .with_duplicates(DuplicateHosts::Reject)
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateHost(ref name) if name == "sw1"));
    }

    #[test]
    fn test_query_limits_records() {
        let inventory = loader(vec![
            json!({"name": "sw1", "site": "hq"}),
            json!({"name": "sw2", "site": "branch"}),
        ])
        .with_query(Query::all().eq("site", "branch"))
        .load()
        .unwrap();
        assert_eq!(inventory.names(), vec!["sw2"]);
    }

    #[test]
    fn test_extensions_attached_per_host() {
        struct Platform;
        impl Extension for Platform {
            fn name(&self) -> &str {
                "platform"
            }
            fn execute(&self, host: &Host, _call: ExtensionCall<'_>) -> anyhow::Result<Value> {
                Ok(json!(host.platform()))
            }
        }

        let inventory = loader(vec![
            json!({"name": "sw1", "platform": "ios"}),
            json!({"name": "sw2", "platform": "nxos"}),
        ])
        .with_extension(Arc::new(|_: &Host| Box::new(Platform) as Box<dyn Extension>))
        .load()
        .unwrap();

        let sw2 = inventory.host("sw2").unwrap();
        assert!(sw2.has_extension("platform"));
        let out = sw2
            .run_extension("platform", ExtensionCall::new(Default::default()))
            .unwrap();
        assert_eq!(out, json!("nxos"));
    }

    #[test]
    fn test_template_errors_propagate() {
        let mut groups = BTreeMap::new();
        groups.insert(
            "access".to_string(),
            GroupDefinition {
                groups: vec!["missing".into()],
                ..Default::default()
            },
        );
        let result = loader(Vec::new()).with_templates(Defaults::default(), &groups);
        assert!(matches!(result, Err(Error::UnknownParentGroup { .. })));
    }
}
