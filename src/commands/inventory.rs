use super::{build_filter, build_source, load_config};
use crate::Context;
use crate::cli::{InventoryCommand, TaskKind};
use crate::tasks;
use crate::transport;
use crate::ui::{self, ConsoleReporter};
use anyhow::Result;
use colored::Colorize;
use pipeline::{ExecutionFramework, Filter, WorkerPool};
use std::sync::Arc;

pub fn run(ctx: &Context, cmd: InventoryCommand) -> Result<()> {
    match cmd {
        InventoryCommand::Show { filters, json } => show(ctx, &filters, json),
        InventoryCommand::Propose { filters } => propose(ctx, &filters),
    }
}

fn show(ctx: &Context, filters: &[String], json: bool) -> Result<()> {
    let config = load_config(ctx)?;
    let source = build_source(&config)?;
    let filter = build_filter(&config, filters)?;

    let inventory = filter.apply(source.inventory()?);
    let proposal = source.propose_inventory(&inventory)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&proposal.hosts)?);
        return Ok(());
    }

    ui::header(&format!("Hosts ({})", proposal.hosts.len()));
    if proposal.hosts.is_empty() {
        ui::dim("No hosts matched");
        return Ok(());
    }

    for host in &proposal.hosts {
        println!(
            "  {:<20} {:<18} {:<10} {}",
            host.name.bold(),
            host.hostname.as_deref().unwrap_or("-"),
            host.platform.as_deref().unwrap_or("-").cyan(),
            host.groups.join(", ").dimmed()
        );
    }
    println!();
    ui::dim(&format!("from {}", proposal.source));
    Ok(())
}

/// Describe what a run would target, without contacting any device
fn propose(ctx: &Context, filters: &[String]) -> Result<()> {
    let config = load_config(ctx)?;
    let pool = WorkerPool::new(config.runner.workers, transport::factory(&config.runner))
        .with_reporter(Arc::new(ConsoleReporter::new(ctx.quiet).verbose(ctx.verbose > 0)));

    let framework = ExecutionFramework::new(
        build_source(&config)?,
        tasks::build(TaskKind::Command, &config.tasks),
        pool,
    )
    .with_filter(Box::new(build_filter(&config, filters)?));

    framework.propose_inventory()?;
    Ok(())
}
