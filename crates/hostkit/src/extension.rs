//! Host-scoped extensions
//!
//! An extension is a named capability bound to one host at construction
//! time. Task code asks the host to run a capability by name and never needs
//! to know which concrete type backs it, so hosts in one inventory can carry
//! different capability sets.

use crate::host::Host;
use crate::model::Data;
use crate::transport::CommandTransport;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Parameters passed to an extension run
pub struct ExtensionCall<'a> {
    /// Caller-supplied arguments
    pub args: Data,
    /// Open connection to the device, when the caller has one
    pub transport: Option<&'a mut dyn CommandTransport>,
}

impl<'a> ExtensionCall<'a> {
    /// A call with arguments only
    pub fn new(args: Data) -> Self {
        Self {
            args,
            transport: None,
        }
    }

    /// A call that may issue device commands through `transport`
    pub fn with_transport(args: Data, transport: &'a mut dyn CommandTransport) -> Self {
        Self {
            args,
            transport: Some(transport),
        }
    }

    /// String argument lookup
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    /// Take the transport, or fail naming the extension that needed it
    pub fn require_transport(&mut self, extension: &str) -> anyhow::Result<&mut dyn CommandTransport> {
        match self.transport.as_deref_mut() {
            Some(transport) => Ok(transport),
            None => anyhow::bail!("extension '{}' needs an open device connection", extension),
        }
    }
}

/// A named capability bound to one host
pub trait Extension: Send + Sync {
    /// Unique name this extension is registered under
    fn name(&self) -> &str;

    /// Run the capability against `host`
    fn execute(&self, host: &Host, call: ExtensionCall<'_>) -> anyhow::Result<Value>;
}

/// Builds an extension bound to the given host
pub type ExtensionFactory = Arc<dyn Fn(&Host) -> Box<dyn Extension> + Send + Sync>;

/// Per-host map from extension name to extension
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: BTreeMap<String, Box<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Register an extension under its declared name, returning any it replaced
    pub fn insert(&mut self, extension: Box<dyn Extension>) -> Option<Box<dyn Extension>> {
        self.extensions
            .insert(extension.name().to_string(), extension)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Extension> {
        self.extensions.get(name).map(AsRef::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Defaults;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        name: &'static str,
        host: String,
        calls: Arc<AtomicUsize>,
    }

    impl Extension for Echo {
        fn name(&self) -> &str {
            self.name
        }

        fn execute(&self, host: &Host, call: ExtensionCall<'_>) -> anyhow::Result<Value> {
            assert_eq!(host.name(), self.host);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "by": self.name, "args": call.args }))
        }
    }

    fn echo_factory(name: &'static str, calls: &Arc<AtomicUsize>) -> ExtensionFactory {
        let calls = Arc::clone(calls);
        Arc::new(move |host: &Host| {
            Box::new(Echo {
                name,
                host: host.name().to_string(),
                calls: Arc::clone(&calls),
            }) as Box<dyn Extension>
        })
    }

    #[test]
    fn test_run_extension_dispatches_by_name() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut host = Host::new("sw1", Arc::new(Defaults::default()));
        host.attach_extensions(&[echo_factory("echo", &calls), echo_factory("other", &calls)]);

        let mut args = Data::new();
        args.insert("command".into(), json!("show version"));
        let out = host.run_extension("echo", ExtensionCall::new(args)).unwrap();

        assert_eq!(out["by"], json!("echo"));
        assert_eq!(out["args"]["command"], json!("show version"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_extension_does_not_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut host = Host::new("sw1", Arc::new(Defaults::default()));
        host.attach_extensions(&[echo_factory("echo", &calls)]);

        let err = host
            .run_extension("missing", ExtensionCall::new(Data::new()))
            .unwrap_err();

        assert_eq!(err.to_string(), "extension 'missing' not found in host 'sw1'");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_name_collision_is_last_write_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut host = Host::new("sw1", Arc::new(Defaults::default()));
        host.attach_extensions(&[echo_factory("dup", &first), echo_factory("dup", &second)]);

        assert_eq!(host.extensions().len(), 1);
        host.run_extension("dup", ExtensionCall::new(Data::new()))
            .unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_require_transport_without_connection() {
        let mut call = ExtensionCall::new(Data::new());
        let err = call.require_transport("command").err().unwrap();
        assert!(err.to_string().contains("'command'"));
    }
}
