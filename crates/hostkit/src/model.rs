//! Inventory entities: connection profiles, defaults and groups
//!
//! Groups are frozen once linked. Parents are shared `Arc` references, so a
//! resolved group graph can be read from any number of worker threads.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Free-form key/value data attached to hosts, groups and defaults
pub type Data = serde_json::Map<String, Value>;

/// A raw document as returned by a document source
pub type Record = serde_json::Map<String, Value>;

/// Named connection profiles, keyed by connection method (e.g. "ssh")
pub type ConnectionMap = BTreeMap<String, ConnectionOptions>;

/// Treat an explicit `null` the same as a missing field
///
/// Template files often carry `data:` with nothing after it.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A scalar attribute as written in records and templates
///
/// Null and empty strings are unset, numbers are stringified.
pub(crate) fn scalar_text(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(format!("expected a string, got {other}")),
    }
}

/// A port as written in records and templates: a number or a numeric string
pub(crate) fn port_number(value: Value) -> Result<Option<u16>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .map(Some)
            .ok_or_else(|| format!("{n} is not a valid port")),
        Value::String(s) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| format!("{s} is not a valid port")),
        other => Err(format!("expected a number, got {other}")),
    }
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_text(Value::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

pub(crate) fn lenient_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    port_number(Value::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

/// A named connection profile for one transport method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_port")]
    pub port: Option<u16>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub username: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub password: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub platform: Option<String>,
    /// Method-specific settings passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
}

/// Bottom-of-chain fallback for every host and group in one load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
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
}

/// A named, inheritable attribute template
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub platform: Option<String>,
    pub data: Data,
    pub connection_options: ConnectionMap,
    /// Parent groups in declaration order
    pub parents: Vec<Arc<Group>>,
    pub defaults: Arc<Defaults>,
}

impl Group {
    /// Create a group with no attributes, data or parents
    pub fn new(name: impl Into<String>, defaults: Arc<Defaults>) -> Self {
        Self {
            name: name.into(),
            hostname: None,
            port: None,
            username: None,
            password: None,
            platform: None,
            data: Data::new(),
            connection_options: ConnectionMap::new(),
            parents: Vec::new(),
            defaults,
        }
    }

    /// Stand-in for a group name a host references but no template defines
    pub fn placeholder(name: impl Into<String>, defaults: Arc<Defaults>) -> Self {
        Self::new(name, defaults)
    }

    /// First value `pick` yields on this group, then on its parents depth-first
    ///
    /// Defaults are not consulted; hosts do that after every group chain.
    pub fn find<'a, T, F>(&'a self, pick: F) -> Option<&'a T>
    where
        T: ?Sized,
        F: Fn(&'a Group) -> Option<&'a T>,
    {
        self.find_by(&pick)
    }

    pub(crate) fn find_by<'a, T, F>(&'a self, pick: &F) -> Option<&'a T>
    where
        T: ?Sized,
        F: Fn(&'a Group) -> Option<&'a T>,
    {
        if let Some(value) = pick(self) {
            return Some(value);
        }
        self.parents.iter().find_map(|parent| parent.find_by(pick))
    }

    /// Whether this group is `name` or inherits from it
    pub fn is_or_inherits(&self, name: &str) -> bool {
        self.name == name || self.parents.iter().any(|p| p.is_or_inherits(name))
    }

    /// This group followed by all of its ancestors, depth-first
    pub fn lineage(&self) -> Vec<&Group> {
        let mut out = Vec::new();
        self.collect_lineage(&mut out);
        out
    }

    fn collect_lineage<'a>(&'a self, out: &mut Vec<&'a Group>) {
        out.push(self);
        for parent in &self.parents {
            parent.collect_lineage(out);
        }
    }

    /// Names of the direct parents
    pub fn parent_names(&self) -> Vec<&str> {
        self.parents.iter().map(|p| p.name.as_str()).collect()
    }
}
