use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use pipeline::{ExecutionMode, InventoryProposal, Reporter, ResultRecord, RunSummary};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Run reporting
// ============================================================================

/// Progress bar while hosts run, colored summary afterwards
pub struct ConsoleReporter {
    bar: ProgressBar,
    quiet: bool,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet,
            verbose: false,
        }
    }

    /// Also list hosts as they succeed
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Reporter for ConsoleReporter {
    fn on_start(&self, task: &str, hosts: usize, mode: ExecutionMode) {
        if self.quiet || hosts == 0 {
            return;
        }
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            self.bar.set_style(style.progress_chars("=>-"));
        }
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.set_length(hosts as u64);
        self.bar.set_position(0);
        self.bar.set_message(format!("{task} ({mode})"));
    }

    fn on_host_complete(&self, record: &ResultRecord) {
        self.bar.inc(1);
        if self.quiet {
            return;
        }
        if !record.failed && self.verbose {
            self.bar.suspend(|| println!("  {} {}", "✓".green(), record.host));
        } else if record.failed {
            self.bar.suspend(|| {
                println!(
                    "  {} {} ({})",
                    "✗".red(),
                    record.host,
                    record.error.as_deref().unwrap_or("failed")
                );
            });
        }
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }

    fn summary(
        &self,
        task: &str,
        mode: ExecutionMode,
        summary: &RunSummary,
        records: &[ResultRecord],
    ) {
        println!();
        if summary.is_success() {
            println!(
                "  {} {} ({}) finished on {} hosts",
                "✓".green().bold(),
                task,
                mode,
                summary.total()
            );
        } else {
            println!(
                "  {} {} ({}) finished with errors",
                "⚠".yellow().bold(),
                task,
                mode
            );
        }

        if summary.succeeded > 0 {
            println!("    • {} hosts succeeded", summary.succeeded);
        }
        if summary.failed > 0 {
            println!("    • {} {} failed", summary.failed, "hosts".red());
            for record in records.iter().filter(|r| r.failed) {
                println!(
                    "      {} {}: {}",
                    "✗".red(),
                    record.host,
                    record.error.as_deref().unwrap_or("failed")
                );
            }
        }
    }

    fn proposal(&self, proposal: &InventoryProposal) {
        header(&format!("Inventory from {}", proposal.source));
        kv("hosts", &proposal.hosts.len().to_string());
        kv("groups", &proposal.groups.len().to_string());

        for host in &proposal.hosts {
            section(&host.name);
            kv("hostname", host.hostname.as_deref().unwrap_or("-"));
            kv("platform", host.platform.as_deref().unwrap_or("-"));
            if let Some(port) = host.port {
                kv("port", &port.to_string());
            }
            if let Some(username) = &host.username {
                kv("username", username);
            }
            if !host.groups.is_empty() {
                kv("groups", &host.groups.join(", "));
            }
            if !host.extensions.is_empty() {
                dim(&format!("extensions: {}", host.extensions.join(", ")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_verbosity() {
        let reporter = ConsoleReporter::new(false);
        assert!(!reporter.verbose);
        let reporter = reporter.verbose(true);
        assert!(reporter.verbose && !reporter.quiet);

        // Hidden bar: reporting without a started run must not panic
        reporter.on_host_complete(&ResultRecord::success("sw1"));
        reporter.on_host_complete(&ResultRecord::failed_with("sw2", "timed out"));
        reporter.on_finish();
    }
}
