use super::{build_filter, build_post_processors, build_source, load_config};
use crate::Context;
use crate::cli::RunArgs;
use crate::config::TransportKind;
use crate::tasks::{self, PROPOSED_CONFIG};
use crate::transport;
use crate::ui::{self, ConsoleReporter};
use anyhow::{Result, bail};
use dialoguer::Confirm;
use pipeline::{ExecutionFramework, ExecutionMode, ResultRecord, RunReport, WorkerPool};
use serde_json::Value;
use std::sync::Arc;

pub fn run(ctx: &Context, args: RunArgs) -> Result<()> {
    let mut config = load_config(ctx)?;
    if let Some(workers) = args.workers {
        config.runner.workers = workers.max(1);
    }
    if args.dry_run {
        config.runner.transport = TransportKind::DryRun;
    }

    let mode = if args.apply {
        ExecutionMode::Apply
    } else {
        ExecutionMode::Propose
    };

    let pool = WorkerPool::new(config.runner.workers, transport::factory(&config.runner))
        .with_reporter(Arc::new(ConsoleReporter::new(ctx.quiet).verbose(ctx.verbose > 0)));

    let mut framework = ExecutionFramework::new(
        build_source(&config)?,
        tasks::build(args.task, &config.tasks),
        pool,
    )
    .with_filter(Box::new(build_filter(&config, &args.filters)?))
    .with_mode(mode);

    for post in build_post_processors(&config) {
        framework = framework.with_post_processor(post);
    }

    if !framework.mode().is_apply() {
        let report = framework.execute()?;
        if !ctx.quiet {
            print_proposed(&report.records);
        }
        return finish(&report);
    }

    ui::header("Applying changes");
    if config.runner.transport == TransportKind::DryRun {
        ui::warn("Dry run - commands are echoed, not sent");
    }
    let confirmed = framework.execute_confirmed(|proposal| {
        if proposal.hosts.is_empty() {
            ui::info("No hosts matched; nothing to do");
            return Ok(false);
        }
        if args.yes || confirm_proceed()? {
            return Ok(true);
        }
        ui::info("Aborted");
        Ok(false)
    })?;

    match confirmed {
        Some(report) => finish(&report),
        None => Ok(()),
    }
}

fn confirm_proceed() -> Result<bool> {
    println!();
    let proceed = Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()?;
    Ok(proceed)
}

/// Print the config blocks a propose run found, per host and interface
fn print_proposed(records: &[ResultRecord]) {
    for record in records.iter().filter(|r| !r.failed) {
        let Some(Value::Object(blocks)) = record.get(PROPOSED_CONFIG) else {
            continue;
        };
        for (interface, lines) in blocks {
            println!(
                "Proposed configuration for {} on interface {}:",
                record.host, interface
            );
            for line in lines.as_array().into_iter().flatten() {
                println!("{}", line.as_str().unwrap_or_default());
            }
        }
    }
}

fn finish(report: &RunReport) -> Result<()> {
    for failure in &report.post_processor_failures {
        ui::error(&format!(
            "post-processor '{}' failed: {}",
            failure.name, failure.error
        ));
    }

    if !report.summary.is_success() {
        bail!(
            "{} failed on {} of {} hosts",
            report.task,
            report.summary.failed,
            report.summary.total()
        );
    }
    if !report.post_processor_failures.is_empty() {
        bail!("{} post-processors failed", report.post_processor_failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{PostProcessorFailure, RunSummary};

    fn report(records: Vec<ResultRecord>, post_failures: Vec<PostProcessorFailure>) -> RunReport {
        RunReport {
            task: "bounce-ports".into(),
            mode: ExecutionMode::Apply,
            summary: RunSummary::from_records(&records),
            records,
            post_processor_failures: post_failures,
        }
    }

    #[test]
    fn test_finish_fails_on_host_errors() {
        let err = finish(&report(
            vec![
                ResultRecord::success("sw1"),
                ResultRecord::failed_with("sw2", "timed out"),
            ],
            Vec::new(),
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "bounce-ports failed on 1 of 2 hosts");
    }

    #[test]
    fn test_finish_fails_on_sink_errors() {
        let err = finish(&report(
            vec![ResultRecord::success("sw1")],
            vec![PostProcessorFailure {
                name: "sqlite".into(),
                error: "locked".into(),
            }],
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "1 post-processors failed");
        assert!(finish(&report(vec![ResultRecord::success("sw1")], Vec::new())).is_ok());
    }
}
