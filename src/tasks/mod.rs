//! Tasks runnable from the command line

pub mod auth_order;
pub mod bounce_ports;
pub mod command;
pub mod save_configs;

use crate::cli::TaskKind;
use crate::config::TasksConfig;
use crate::extensions;
use anyhow::Result;
use hostkit::Data;
use pipeline::{ResultRecord, Task, TaskContext};
use serde_json::{Value, json};
use std::time::Duration;

/// Record field holding per-interface config blocks a propose run would send
pub const PROPOSED_CONFIG: &str = "proposed_config";

/// Build the task selected on the command line
pub fn build(kind: TaskKind, config: &TasksConfig) -> Box<dyn Task> {
    match kind {
        TaskKind::Command => Box::new(command::CommandTask::new(
            config.command.commands.clone(),
        )),
        TaskKind::SaveConfigs => Box::new(save_configs::SaveConfigsTask),
        TaskKind::BouncePorts => Box::new(bounce_ports::BouncePortsTask::new(
            config.bounce_ports.vlan.clone(),
            Duration::from_millis(config.bounce_ports.delay_ms),
        )),
        TaskKind::AuthOrder => Box::new(auth_order::AuthOrderTask),
    }
}

/// Run an exec-mode command through the host's `command` extension
fn show(ctx: &mut TaskContext<'_>, command: &str) -> Result<String> {
    let mut args = Data::new();
    args.insert("command".into(), Value::String(command.to_string()));
    let output = ctx.run_extension(extensions::COMMAND, args)?;
    Ok(output.as_str().unwrap_or_default().to_string())
}

/// Send config lines through the host's `config` extension
fn configure(ctx: &mut TaskContext<'_>, lines: &[String]) -> Result<String> {
    let mut args = Data::new();
    args.insert("commands".into(), json!(lines));
    let output = ctx.run_extension(extensions::CONFIG, args)?;
    Ok(output.as_str().unwrap_or_default().to_string())
}

/// `interface <name>` followed by the given sub-commands
fn interface_block(interface: &str, lines: &[&str]) -> Vec<String> {
    std::iter::once(format!("interface {interface}"))
        .chain(lines.iter().map(|l| (*l).to_string()))
        .collect()
}

/// Success record listing `interfaces` and the block each one would get
fn proposal_record(
    ctx: &TaskContext<'_>,
    interfaces: &[String],
    block: impl Fn(&str) -> Vec<String>,
) -> ResultRecord {
    let proposed: serde_json::Map<String, Value> = interfaces
        .iter()
        .map(|i| (i.clone(), json!(block(i))))
        .collect();
    ctx.success()
        .with("interfaces", json!(interfaces))
        .with(PROPOSED_CONFIG, Value::Object(proposed))
}
