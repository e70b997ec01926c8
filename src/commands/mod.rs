//! Command implementations and the builders they share

pub mod inventory;
pub mod run;

use crate::Context;
use crate::config::{NetfleetConfig, PostProcessorConfig};
use crate::credentials::CredentialedSource;
use crate::extensions;
use crate::paths;
use anyhow::{Context as _, Result};
use hostkit::{Defaults, DuplicateHosts, InventoryLoader, template};
use pipeline::{
    FieldFilter, InventorySource, JsonFilePostProcessor, MongoPostProcessor, PostProcessor,
    PrintPostProcessor, SpreadsheetPostProcessor, SqlitePostProcessor,
};
use std::collections::BTreeMap;

pub fn load_config(ctx: &Context) -> Result<NetfleetConfig> {
    NetfleetConfig::load(ctx.config.as_deref())
}

/// Loader for the configured document source, templates and extensions
pub fn build_loader(config: &NetfleetConfig) -> Result<InventoryLoader> {
    let source = &config.source;
    let uri = source.expanded_uri();
    let documents = hostkit::source::open(&uri)
        .with_context(|| format!("Failed to open inventory source {uri}"))?;

    let mut loader = InventoryLoader::new(documents, &source.database, &source.collection)
        .with_query(source.query());

    for transform in &config.transforms {
        loader = loader.with_transform(transform.clone().into_transform());
    }
    for factory in extensions::factories(&config.extensions)? {
        loader = loader.with_extension(factory);
    }

    let groups = match source.groups_path() {
        Some(path) => template::load_groups(&path)?,
        None => BTreeMap::new(),
    };
    let defaults = match source.defaults_path() {
        Some(path) => template::load_defaults(&path)?,
        None => Defaults::default(),
    };
    loader = loader
        .with_templates(defaults, &groups)
        .context("Invalid group templates")?;

    if source.strict_duplicates {
        loader = loader.with_duplicates(DuplicateHosts::Reject);
    }

    log::debug!("inventory source: {}", loader.describe());
    Ok(loader)
}

/// The loader wrapped with run-wide credentials
pub fn build_source(config: &NetfleetConfig) -> Result<Box<dyn InventorySource>> {
    let loader = build_loader(config)?;
    let credentials = &config.credentials;
    if credentials.is_empty() {
        return Ok(Box::new(loader));
    }
    Ok(Box::new(CredentialedSource::new(
        Box::new(loader),
        credentials.username.clone(),
        credentials.password()?,
    )))
}

/// Config `[filter]` criteria with `--filter` pairs layered on top
pub fn build_filter(config: &NetfleetConfig, pairs: &[String]) -> Result<FieldFilter> {
    let mut filter = FieldFilter::new(config.filter.clone());
    for (key, value) in FieldFilter::from_pairs(pairs)?.criteria() {
        filter = filter.with(key.clone(), value.clone());
    }
    Ok(filter)
}

pub fn build_post_processors(config: &NetfleetConfig) -> Vec<Box<dyn PostProcessor>> {
    config
        .post_processors
        .iter()
        .map(|post| -> Box<dyn PostProcessor> {
            match post {
                PostProcessorConfig::Print => Box::new(PrintPostProcessor),
                PostProcessorConfig::Json { path } => {
                    Box::new(JsonFilePostProcessor::new(paths::expand(path)))
                }
                PostProcessorConfig::Sqlite { path } => {
                    Box::new(SqlitePostProcessor::new(paths::expand(path)))
                }
                PostProcessorConfig::Spreadsheet { path } => {
                    Box::new(SpreadsheetPostProcessor::new(paths::expand(path)))
                }
                PostProcessorConfig::Mongodb {
                    uri,
                    database,
                    collection,
                } => Box::new(MongoPostProcessor::new(uri, database, collection)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir, extra: &str) -> NetfleetConfig {
        let db = dir.path().join("network_inventory");
        fs::create_dir_all(&db).unwrap();
        fs::write(
            db.join("devices.json"),
            r#"[
                {"name": "sw1", "hostname": "10.0.0.1", "groups": "access", "site": "hq"},
                {"name": "sw2", "hostname": "10.0.0.2", "groups": ["access", "ghost"], "site": "dc"},
                {"name": "rtr1", "hostname": "10.0.1.1", "platform": "IOSXR", "site": "hq"}
            ]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("groups.yaml"),
            "access:\n  platform: ios\n  username: admin\n",
        )
        .unwrap();

        let text = format!(
            "[source]\nuri = \"file://{}\"\ngroups_file = \"{}\"\n{}",
            dir.path().display(),
            dir.path().join("groups.yaml").display(),
            extra
        );
        NetfleetConfig::parse(&text).unwrap()
    }

    #[test]
    fn test_loader_from_config() {
        let dir = TempDir::new().unwrap();
        let config = fixture(
            &dir,
            "\n[[transform]]\nkind = \"lowercase\"\nfield = \"platform\"\n",
        );

        let inventory = build_loader(&config).unwrap().load().unwrap();

        assert_eq!(inventory.names(), vec!["rtr1", "sw1", "sw2"]);
        let sw1 = inventory.host("sw1").unwrap();
        assert_eq!(sw1.platform(), Some("ios"));
        assert_eq!(sw1.username(), Some("admin"));
        assert_eq!(inventory.host("rtr1").unwrap().platform(), Some("iosxr"));
        assert!(sw1.has_extension("command"));
        assert!(inventory.host("sw2").unwrap().has_group("ghost"));
    }

    #[test]
    fn test_query_from_config() {
        let dir = TempDir::new().unwrap();
        let config = fixture(&dir, "[source.query]\nsite = \"hq\"\n");
        let inventory = build_loader(&config).unwrap().load().unwrap();
        assert_eq!(inventory.names(), vec!["rtr1", "sw1"]);
    }

    #[test]
    fn test_filter_merges_config_and_flags() {
        let dir = TempDir::new().unwrap();
        let config = fixture(&dir, "[filter]\nsite = \"hq\"\nplatform = \"iosxr\"\n");

        let filter = build_filter(&config, &["platform=ios".to_string()]).unwrap();
        let source = build_source(&config).unwrap();
        let selected = pipeline::Filter::apply(&filter, source.inventory().unwrap());

        assert_eq!(selected.names(), vec!["sw1"]);
    }

    #[test]
    fn test_source_with_credentials() {
        let dir = TempDir::new().unwrap();
        let config = fixture(&dir, "[credentials]\nusername = \"netops\"\n");
        let inventory = build_source(&config).unwrap().inventory().unwrap();
        assert_eq!(inventory.host("sw1").unwrap().username(), Some("netops"));
    }

    #[test]
    fn test_post_processors_in_order() {
        let config = NetfleetConfig::parse(
            r#"
[[post_processor]]
kind = "print"

[[post_processor]]
kind = "json"
path = "/tmp/r.json"

[[post_processor]]
kind = "mongodb"
uri = "mongodb://db1:27017"
database = "network_inventory"
collection = "results"

[[post_processor]]
kind = "spreadsheet"
path = "/tmp/r.csv"
"#,
        )
        .unwrap();
        let names: Vec<String> = build_post_processors(&config)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["print", "json", "mongodb", "spreadsheet"]);
    }

    #[test]
    fn test_missing_groups_file_is_an_error() {
        let config = NetfleetConfig::parse(
            "[source]\nuri = \"/tmp\"\ngroups_file = \"/nonexistent/netfleet/groups.yaml\"\n",
        )
        .unwrap();
        let err = build_loader(&config).err().unwrap();
        assert!(err.to_string().contains("groups.yaml"));
    }
}
