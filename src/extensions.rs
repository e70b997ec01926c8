//! Built-in host extensions
//!
//! Every extension here talks to the device, so each one refuses to run on a
//! host whose platform is unknown.

use anyhow::{Context, Result, anyhow};
use hostkit::{Extension, ExtensionCall, ExtensionFactory, Host};
use serde_json::Value;
use std::sync::Arc;

/// Run one exec-mode command: `{"command": "show version"}`
pub const COMMAND: &str = "command";

/// Alias of [`COMMAND`] kept for existing inventories
pub const NETMIKO_COMMAND: &str = "netmiko_command";

/// Send configuration lines: `{"commands": ["interface Gi1/0/1", " shutdown"]}`
pub const CONFIG: &str = "config";

/// Persist the running configuration
pub const SAVE_CONFIG: &str = "save_config";

pub const BUILTIN: &[&str] = &[COMMAND, NETMIKO_COMMAND, CONFIG, SAVE_CONFIG];

/// Factory for a built-in extension, by name
pub fn factory(name: &str) -> Option<ExtensionFactory> {
    let kind = match name {
        COMMAND => Kind::Command(COMMAND),
        NETMIKO_COMMAND => Kind::Command(NETMIKO_COMMAND),
        CONFIG => Kind::Config,
        SAVE_CONFIG => Kind::SaveConfig,
        _ => return None,
    };
    Some(Arc::new(move |_host: &Host| -> Box<dyn Extension> {
        match kind {
            Kind::Command(name) => Box::new(CommandExtension { name }),
            Kind::Config => Box::new(ConfigExtension),
            Kind::SaveConfig => Box::new(SaveConfigExtension),
        }
    }))
}

/// Factories for every name, failing on the first unknown one
pub fn factories(names: &[String]) -> Result<Vec<ExtensionFactory>> {
    names
        .iter()
        .map(|name| factory(name).ok_or_else(|| anyhow!("Unknown extension '{name}'")))
        .collect()
}

#[derive(Clone, Copy)]
enum Kind {
    Command(&'static str),
    Config,
    SaveConfig,
}

fn require_platform(host: &Host, extension: &str) -> Result<()> {
    if host.platform().is_none() {
        return Err(hostkit::Error::PlatformRequired {
            host: host.name().to_string(),
            extension: extension.to_string(),
        }
        .into());
    }
    Ok(())
}

struct CommandExtension {
    name: &'static str,
}

impl Extension for CommandExtension {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, host: &Host, mut call: ExtensionCall<'_>) -> Result<Value> {
        require_platform(host, self.name)?;
        let command = call
            .arg_str("command")
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("'{}' needs a 'command' argument", self.name))?;

        let transport = call.require_transport(self.name)?;
        let output = transport
            .send_command(&command)
            .with_context(|| format!("'{command}' failed on {}", host.name()))?;
        Ok(Value::String(output))
    }
}

struct ConfigExtension;

impl Extension for ConfigExtension {
    fn name(&self) -> &str {
        CONFIG
    }

    fn execute(&self, host: &Host, mut call: ExtensionCall<'_>) -> Result<Value> {
        require_platform(host, CONFIG)?;
        let commands: Vec<String> = match call.args.get("commands") {
            Some(Value::Array(lines)) => lines
                .iter()
                .map(|l| {
                    l.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| anyhow!("'{CONFIG}' commands must be strings"))
                })
                .collect::<Result<_>>()?,
            _ => anyhow::bail!("'{CONFIG}' needs a 'commands' list"),
        };

        let transport = call.require_transport(CONFIG)?;
        let output = transport
            .send_config(&commands)
            .with_context(|| format!("configuration failed on {}", host.name()))?;
        Ok(Value::String(output))
    }
}

struct SaveConfigExtension;

impl Extension for SaveConfigExtension {
    fn name(&self) -> &str {
        SAVE_CONFIG
    }

    fn execute(&self, host: &Host, mut call: ExtensionCall<'_>) -> Result<Value> {
        require_platform(host, SAVE_CONFIG)?;
        let transport = call.require_transport(SAVE_CONFIG)?;
        let output = transport
            .save_config()
            .with_context(|| format!("saving configuration failed on {}", host.name()))?;
        Ok(Value::String(output))
    }
}
