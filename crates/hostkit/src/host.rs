//! Host - the resolved unit of work
//!
//! Attribute lookups follow one order everywhere:
//! 1. the value set on the host itself
//! 2. each owning group in declared order, searching the group and then its
//!    parents depth-first before moving on to the next owning group
//! 3. the load's defaults
//!
//! Nothing is cached, so values set on a host after loading (credentials,
//! task results) are visible immediately.

use crate::error::{Error, Result};
use crate::extension::{Extension, ExtensionCall, ExtensionFactory, ExtensionRegistry};
use crate::model::{ConnectionMap, ConnectionOptions, Data, Defaults, Group};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

/// A fully-resolvable device record
#[derive(Debug)]
pub struct Host {
    name: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub platform: Option<String>,
    /// Owning groups, most specific first
    pub groups: Vec<Arc<Group>>,
    pub data: Data,
    pub connection_options: ConnectionMap,
    pub defaults: Arc<Defaults>,
    extensions: ExtensionRegistry,
}

impl Host {
    /// Create a host with nothing set but its name
    pub fn new(name: impl Into<String>, defaults: Arc<Defaults>) -> Self {
        Self {
            name: name.into(),
            hostname: None,
            port: None,
            username: None,
            password: None,
            platform: None,
            groups: Vec::new(),
            data: Data::new(),
            connection_options: ConnectionMap::new(),
            defaults,
            extensions: ExtensionRegistry::default(),
        }
    }

    /// Unique name of this host within its inventory
    pub fn name(&self) -> &str {
        &self.name
    }

    fn inherited<'a, T, F>(&'a self, pick: F) -> Option<&'a T>
    where
        T: ?Sized,
        F: Fn(&'a Group) -> Option<&'a T>,
    {
        self.groups.iter().find_map(|group| group.find_by(&pick))
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname
            .as_deref()
            .or_else(|| self.inherited(|g| g.hostname.as_deref()))
            .or(self.defaults.hostname.as_deref())
    }

    pub fn port(&self) -> Option<u16> {
        self.port
            .or_else(|| self.inherited(|g| g.port.as_ref()).copied())
            .or(self.defaults.port)
    }

    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .or_else(|| self.inherited(|g| g.username.as_deref()))
            .or(self.defaults.username.as_deref())
    }

    pub fn password(&self) -> Option<&str> {
        self.password
            .as_deref()
            .or_else(|| self.inherited(|g| g.password.as_deref()))
            .or(self.defaults.password.as_deref())
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform
            .as_deref()
            .or_else(|| self.inherited(|g| g.platform.as_deref()))
            .or(self.defaults.platform.as_deref())
    }

    /// Look up a data key through the host, its groups and the defaults
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data
            .get(key)
            .or_else(|| self.inherited(|g| g.data.get(key)))
            .or_else(|| self.defaults.data.get(key))
    }

    /// Whether the key resolves anywhere in the chain
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Every data key merged into one map, more specific sources winning
    pub fn resolved_data(&self) -> Data {
        let mut layers: Vec<&Data> = vec![&self.data];
        for group in &self.groups {
            layers.extend(group.lineage().into_iter().map(|g| &g.data));
        }
        layers.push(&self.defaults.data);

        let mut merged = Data::new();
        for layer in layers.into_iter().rev() {
            for (key, value) in layer {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    /// Whether the host belongs to `name`, directly or through a parent group
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.is_or_inherits(name))
    }

    /// Names of the owning groups, in order
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Resolve the connection profile for `method`
    ///
    /// Each field comes from the first profile that sets it (host, then groups
    /// in resolution order, then defaults); anything still unset falls back to
    /// the host's own resolved attribute.
    pub fn connection_parameters(&self, method: &str) -> ConnectionOptions {
        let mut profiles: Vec<&ConnectionOptions> = Vec::new();
        profiles.extend(self.connection_options.get(method));
        for group in &self.groups {
            for g in group.lineage() {
                profiles.extend(g.connection_options.get(method));
            }
        }
        profiles.extend(self.defaults.connection_options.get(method));

        let first = |pick: fn(&ConnectionOptions) -> Option<&String>| {
            profiles.iter().find_map(|p| pick(p)).cloned()
        };

        ConnectionOptions {
            hostname: first(|p| p.hostname.as_ref())
                .or_else(|| self.hostname().map(str::to_owned)),
            port: profiles
                .iter()
                .find_map(|p| p.port)
                .or_else(|| self.port()),
            username: first(|p| p.username.as_ref())
                .or_else(|| self.username().map(str::to_owned)),
            password: first(|p| p.password.as_ref())
                .or_else(|| self.password().map(str::to_owned)),
            platform: first(|p| p.platform.as_ref())
                .or_else(|| self.platform().map(str::to_owned)),
            extras: profiles.iter().find_map(|p| p.extras.clone()),
        }
    }

    /// Build the extension registry from factories, in order
    ///
    /// A later extension with an already-registered name replaces the earlier one.
    pub fn attach_extensions(&mut self, factories: &[ExtensionFactory]) {
        let host: &Host = self;
        let built: Vec<Box<dyn Extension>> = factories.iter().map(|factory| factory(host)).collect();
        for extension in built {
            let name = extension.name().to_string();
            if self.extensions.insert(extension).is_some() {
                debug!("host '{}': extension '{}' replaced by a later one", self.name, name);
            }
        }
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    /// Get a registered extension, or the host/name-identifying error
    pub fn extension(&self, name: &str) -> Result<&dyn Extension> {
        self.extensions
            .get(name)
            .ok_or_else(|| Error::ExtensionNotFound {
                host: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Run the named extension with the caller's parameters
    pub fn run_extension(&self, name: &str, call: ExtensionCall<'_>) -> anyhow::Result<Value> {
        let extension = self.extension(name)?;
        extension.execute(self, call)
    }
}
