use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netfleet")]
#[command(author = "netfleet contributors")]
#[command(version)]
#[command(about = "Resolve network device inventories and run tasks across them", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/netfleet/config.toml)
    #[arg(short, long, global = true, env = "NETFLEET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect the resolved inventory
    #[command(subcommand)]
    Inventory(InventoryCommand),

    /// Run a task against the inventory (propose mode unless --apply)
    Run(RunArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum InventoryCommand {
    /// List resolved hosts
    Show {
        /// Filter criterion (key=value, repeatable)
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Print hosts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe the inventory a run would target
    Propose {
        /// Filter criterion (key=value, repeatable)
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Task to run
    #[arg(value_enum)]
    pub task: TaskKind,

    /// Make changes instead of proposing them
    #[arg(long)]
    pub apply: bool,

    /// Skip the confirmation prompt in apply mode
    #[arg(short, long)]
    pub yes: bool,

    /// Hosts processed in parallel (overrides [runner] workers)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Echo commands instead of connecting to devices
    #[arg(long)]
    pub dry_run: bool,

    /// Filter criterion (key=value, repeatable)
    #[arg(short, long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaskKind {
    /// Run the commands listed under [tasks.command]
    Command,
    /// Save running configurations
    SaveConfigs,
    /// Shut and re-enable 802.1X ports in the configured VLAN
    BouncePorts,
    /// Set MAB-before-dot1x authentication order on dot1x interfaces
    AuthOrder,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "netfleet", "-vv", "run", "bounce-ports", "--apply", "--yes", "-f", "site=hq", "-f",
            "platform=ios", "--workers", "5",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.task, TaskKind::BouncePorts);
        assert!(args.apply && args.yes && !args.dry_run);
        assert_eq!(args.workers, Some(5));
        assert_eq!(args.filters, vec!["site=hq", "platform=ios"]);
    }

    #[test]
    fn test_parse_inventory_show() {
        let cli =
            Cli::try_parse_from(["netfleet", "inventory", "show", "--json", "-c", "/tmp/n.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/n.toml")));
        assert!(matches!(
            cli.command,
            Command::Inventory(InventoryCommand::Show { json: true, .. })
        ));
    }
}
