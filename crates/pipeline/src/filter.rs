//! Host filters

use anyhow::{Result, bail};
use hostkit::{Host, Inventory};
use serde_json::Value;
use std::collections::BTreeMap;

/// Narrows an inventory before a task runs
pub trait Filter: Send + Sync {
    fn apply(&self, inventory: Inventory) -> Inventory;
}

impl<F> Filter for F
where
    F: Fn(&Host) -> bool + Send + Sync,
{
    fn apply(&self, inventory: Inventory) -> Inventory {
        inventory.filter(self)
    }
}

/// Keeps hosts matching every `key = value` criterion
///
/// `name`, `hostname`, `platform`, `username` and `port` compare against the
/// resolved attribute, `group` tests group membership (including parent
/// groups), and any other key compares against resolved data. An array value
/// matches when any element does. Scalars compare by their text form, so
/// `port=22` matches a numeric 22.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldFilter {
    criteria: BTreeMap<String, Value>,
}

impl FieldFilter {
    pub fn new(criteria: BTreeMap<String, Value>) -> Self {
        Self { criteria }
    }

    /// Parse `key=value` pairs, as given on the command line
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut criteria = BTreeMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                bail!("invalid filter '{pair}': expected key=value");
            };
            let key = key.trim();
            if key.is_empty() {
                bail!("invalid filter '{pair}': empty key");
            }
            criteria.insert(key.to_string(), Value::String(value.trim().to_string()));
        }
        Ok(Self { criteria })
    }

    /// Add or replace one criterion
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(key.into(), value.into());
        self
    }

    pub fn criteria(&self) -> &BTreeMap<String, Value> {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn matches(&self, host: &Host) -> bool {
        self.criteria
            .iter()
            .all(|(key, expected)| criterion_matches(host, key, expected))
    }
}

impl Filter for FieldFilter {
    fn apply(&self, inventory: Inventory) -> Inventory {
        if self.is_empty() {
            return inventory;
        }
        inventory.filter(|host| self.matches(host))
    }
}

fn criterion_matches(host: &Host, key: &str, expected: &Value) -> bool {
    if let Value::Array(options) = expected {
        return options.iter().any(|o| criterion_matches(host, key, o));
    }

    match key {
        "group" => scalar_text(expected).is_some_and(|g| host.has_group(&g)),
        "name" => text_matches(Some(host.name()), expected),
        "hostname" => text_matches(host.hostname(), expected),
        "platform" => text_matches(host.platform(), expected),
        "username" => text_matches(host.username(), expected),
        "port" => text_matches(host.port().map(|p| p.to_string()).as_deref(), expected),
        _ => match host.get(key) {
            Some(actual) if actual == expected => true,
            Some(actual) => {
                scalar_text(actual).is_some_and(|a| text_matches(Some(a.as_str()), expected))
            }
            None => false,
        },
    }
}

fn text_matches(actual: Option<&str>, expected: &Value) -> bool {
    match (actual, scalar_text(expected)) {
        (Some(actual), Some(expected)) => actual == expected,
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
