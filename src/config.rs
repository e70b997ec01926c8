//! netfleet configuration file
//!
//! A single TOML file describing where the inventory comes from, how hosts
//! are enriched, how tasks reach devices and where results go.

use crate::extensions;
use crate::paths;
use anyhow::{Context, Result, bail};
use hostkit::{FieldTransform, Query, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetfleetConfig {
    pub source: SourceConfig,

    /// Record transformations, applied in order before hosts are built
    #[serde(rename = "transform")]
    pub transforms: Vec<FieldTransform>,

    /// Built-in extensions attached to every host
    pub extensions: Vec<String>,

    pub credentials: CredentialsConfig,

    pub runner: RunnerConfig,

    /// Criteria every run starts from; `--filter` adds to these
    pub filter: BTreeMap<String, Value>,

    #[serde(rename = "post_processor")]
    pub post_processors: Vec<PostProcessorConfig>,

    pub tasks: TasksConfig,
}

impl Default for NetfleetConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            transforms: Vec::new(),
            extensions: vec![extensions::COMMAND.to_string()],
            credentials: CredentialsConfig::default(),
            runner: RunnerConfig::default(),
            filter: BTreeMap::new(),
            post_processors: Vec::new(),
            tasks: TasksConfig::default(),
        }
    }
}

impl NetfleetConfig {
    /// Load config from `path`, or from the default location
    ///
    /// A missing default file yields the default config; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = paths::config_file()?;
                if !default.exists() {
                    log::info!(
                        "No config at {}, using defaults",
                        default.display()
                    );
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate config text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.source.validate().context("Invalid [source]")?;

        for name in &self.extensions {
            if extensions::factory(name).is_none() {
                bail!(
                    "Unknown extension '{}' (available: {})",
                    name,
                    extensions::BUILTIN.join(", ")
                );
            }
        }

        if self.runner.workers == 0 {
            bail!("Invalid [runner]: workers must be at least 1");
        }

        for post in &self.post_processors {
            post.validate()?;
        }

        if self.tasks.command.commands.is_empty() {
            bail!("Invalid [tasks.command]: commands cannot be empty");
        }
        if self.tasks.bounce_ports.vlan.trim().is_empty() {
            bail!("Invalid [tasks.bounce-ports]: vlan cannot be empty");
        }

        Ok(())
    }
}

// ============================================================================
// Source
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// `file://<dir>` or a plain directory path
    pub uri: String,
    pub database: String,
    pub collection: String,
    pub query: Record,
    pub groups_file: Option<String>,
    pub defaults_file: Option<String>,
    /// Fail the load on duplicate host names instead of keeping the last one
    pub strict_duplicates: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: "~/.local/share/netfleet/inventory".to_string(),
            database: "network_inventory".to_string(),
            collection: "devices".to_string(),
            query: Record::new(),
            groups_file: None,
            defaults_file: None,
            strict_duplicates: false,
        }
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            bail!("uri cannot be empty");
        }
        if self.database.trim().is_empty() {
            bail!("database cannot be empty");
        }
        if self.collection.trim().is_empty() {
            bail!("collection cannot be empty");
        }
        self.query()
            .validate()
            .context("Invalid query")?;
        Ok(())
    }

    /// The source URI with `~` and variables expanded
    pub fn expanded_uri(&self) -> String {
        match self.uri.strip_prefix("file://") {
            Some(rest) => format!("file://{}", paths::expand(rest).display()),
            None if self.uri.contains("://") => self.uri.clone(),
            None => paths::expand(&self.uri).display().to_string(),
        }
    }

    pub fn query(&self) -> Query {
        Query(self.query.clone())
    }

    pub fn groups_path(&self) -> Option<PathBuf> {
        self.groups_file.as_deref().map(paths::expand)
    }

    pub fn defaults_path(&self) -> Option<PathBuf> {
        self.defaults_file.as_deref().map(paths::expand)
    }
}

// ============================================================================
// Credentials & runner
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    /// Name of the environment variable holding the password
    pub password_env: Option<String>,
}

impl CredentialsConfig {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password_env.is_none()
    }

    /// Read the password from the configured environment variable
    pub fn password(&self) -> Result<Option<String>> {
        match &self.password_env {
            Some(var) => std::env::var(var)
                .map(Some)
                .with_context(|| format!("Password variable {var} is not set")),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    #[default]
    Ssh,
    DryRun,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    pub workers: usize,
    pub transport: TransportKind,
    /// Seconds to wait for a device to accept a connection
    pub connect_timeout: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: pipeline::WorkerPool::DEFAULT_WORKERS,
            transport: TransportKind::default(),
            connect_timeout: 10,
        }
    }
}

// ============================================================================
// Post-processors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostProcessorConfig {
    Print,
    Json {
        path: String,
    },
    Sqlite {
        path: String,
    },
    Spreadsheet {
        path: String,
    },
    Mongodb {
        uri: String,
        database: String,
        collection: String,
    },
}

impl PostProcessorConfig {
    fn validate(&self) -> Result<()> {
        match self {
            Self::Print => Ok(()),
            Self::Json { path } | Self::Sqlite { path } | Self::Spreadsheet { path }
                if path.trim().is_empty() =>
            {
                bail!("Invalid [[post_processor]]: path cannot be empty")
            }
            Self::Json { .. } | Self::Sqlite { .. } | Self::Spreadsheet { .. } => Ok(()),
            Self::Mongodb {
                uri,
                database,
                collection,
            } => {
                if uri.trim().is_empty() || database.trim().is_empty() || collection.trim().is_empty()
                {
                    bail!("Invalid [[post_processor]]: mongodb needs uri, database and collection");
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tasks
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct TasksConfig {
    pub command: CommandTaskConfig,
    pub bounce_ports: BouncePortsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandTaskConfig {
    pub commands: Vec<String>,
}

impl Default for CommandTaskConfig {
    fn default() -> Self {
        Self {
            commands: vec!["show version".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BouncePortsConfig {
    /// Access VLAN whose 802.1X ports get bounced
    pub vlan: String,
    /// Pause between ports on the same device
    pub delay_ms: u64,
}

impl Default for BouncePortsConfig {
    fn default() -> Self {
        Self {
            vlan: "21".to_string(),
            delay_ms: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const FULL: &str = r#"
extensions = ["command", "config", "save_config"]

[source]
uri = "file:///srv/inventory"
database = "network_inventory"
collection = "switches"
groups_file = "~/netfleet/groups.yaml"
strict_duplicates = true

[source.query]
site = "hq"
status = { "$ne" = "decommissioned" }

[[transform]]
kind = "lowercase"
field = "platform"

[[transform]]
kind = "default"
field = "port"
value = 22

[credentials]
username = "netops"
password_env = "NETFLEET_PASSWORD"

[runner]
workers = 8
transport = "dry-run"
connect_timeout = 5

[filter]
platform = "ios"
group = ["access", "core"]

[[post_processor]]
kind = "print"

[[post_processor]]
kind = "sqlite"
path = "~/netfleet/results.db"

[[post_processor]]
kind = "spreadsheet"
path = "~/netfleet/results.csv"

[[post_processor]]
kind = "mongodb"
uri = "mongodb://db1:27017"
database = "network_inventory"
collection = "results"

[tasks.command]
commands = ["show version", "show clock"]

[tasks.bounce-ports]
vlan = "30"
delay_ms = 500
"#;

    #[test]
    fn test_parse_full_config() {
        let config = NetfleetConfig::parse(FULL).unwrap();

        assert_eq!(config.source.collection, "switches");
        assert!(config.source.strict_duplicates);
        assert_eq!(config.source.query["site"], json!("hq"));
        assert_eq!(config.transforms.len(), 2);
        assert_eq!(config.extensions.len(), 3);
        assert_eq!(config.credentials.username.as_deref(), Some("netops"));
        assert_eq!(config.runner.workers, 8);
        assert_eq!(config.runner.transport, TransportKind::DryRun);
        assert_eq!(config.filter["group"], json!(["access", "core"]));
        assert_eq!(
            config.post_processors[1],
            PostProcessorConfig::Sqlite {
                path: "~/netfleet/results.db".to_string()
            }
        );
        assert_eq!(
            config.post_processors[3],
            PostProcessorConfig::Mongodb {
                uri: "mongodb://db1:27017".to_string(),
                database: "network_inventory".to_string(),
                collection: "results".to_string(),
            }
        );
        assert_eq!(config.tasks.command.commands, vec!["show version", "show clock"]);
        assert_eq!(config.tasks.bounce_ports.vlan, "30");
        assert_eq!(config.tasks.bounce_ports.delay_ms, 500);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = NetfleetConfig::parse("").unwrap();
        assert_eq!(config, NetfleetConfig::default());
        assert_eq!(config.extensions, vec!["command"]);
        assert_eq!(config.runner.workers, 20);
        assert_eq!(config.runner.transport, TransportKind::Ssh);
        assert_eq!(config.tasks.bounce_ports.vlan, "21");
        assert_eq!(config.tasks.bounce_ports.delay_ms, 3000);
    }

    #[test]
    fn test_validation_errors() {
        let err = NetfleetConfig::parse("[source]\ndatabase = \"\"").unwrap_err();
        assert!(format!("{err:#}").contains("database cannot be empty"));

        let err = NetfleetConfig::parse("[runner]\nworkers = 0").unwrap_err();
        assert!(err.to_string().contains("workers"));

        let err = NetfleetConfig::parse("extensions = [\"telnet\"]").unwrap_err();
        assert!(err.to_string().contains("Unknown extension 'telnet'"));

        let err =
            NetfleetConfig::parse("[[post_processor]]\nkind = \"json\"\npath = \"\"").unwrap_err();
        assert!(err.to_string().contains("path cannot be empty"));

        let err = NetfleetConfig::parse(
            "[[post_processor]]\nkind = \"mongodb\"\nuri = \"mongodb://db1\"\ndatabase = \"inv\"\ncollection = \"\"",
        )
        .unwrap_err();
        assert!(err.to_string().contains("mongodb needs uri, database and collection"));

        let err = NetfleetConfig::parse("[source.query]\nsite = { \"$regex\" = \"hq\" }")
            .unwrap_err();
        assert!(format!("{err:#}").contains("Invalid query"));
    }

    #[test]
    fn test_expanded_uri() {
        let home = dirs::home_dir().unwrap();
        let source = SourceConfig {
            uri: "file://~/inventory".to_string(),
            ..Default::default()
        };
        assert_eq!(
            source.expanded_uri(),
            format!("file://{}", home.join("inventory").display())
        );

        let source = SourceConfig {
            uri: "mongodb://db:27017".to_string(),
            ..Default::default()
        };
        assert_eq!(source.expanded_uri(), "mongodb://db:27017");
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("netfleet.toml");
        fs::write(&path, "[runner]\nworkers = 3\n").unwrap();

        let config = NetfleetConfig::load(Some(&path)).unwrap();
        assert_eq!(config.runner.workers, 3);

        let missing = dir.path().join("missing.toml");
        let err = NetfleetConfig::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Could not read"));
    }

    #[test]
    fn test_password_from_env() {
        let creds = CredentialsConfig {
            username: None,
            password_env: Some("NETFLEET_TEST_PASSWORD_UNSET_4821".to_string()),
        };
        assert!(creds.password().is_err());
        assert_eq!(CredentialsConfig::default().password().unwrap(), None);
    }
}
