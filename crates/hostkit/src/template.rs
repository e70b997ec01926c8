//! Group and defaults template files
//!
//! Format is chosen by extension: `.yaml`/`.yml`, `.toml` or `.json`.
//! An empty file is an empty template.

use crate::error::{Error, Result};
use crate::groups::GroupDefinition;
use crate::model::Defaults;
use log::debug;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Load group definitions keyed by group name
pub fn load_groups(path: &Path) -> Result<BTreeMap<String, GroupDefinition>> {
    let groups: BTreeMap<String, GroupDefinition> = load(path)?;
    debug!("loaded {} group definitions from {}", groups.len(), path.display());
    Ok(groups)
}

/// Load the defaults template
pub fn load_defaults(path: &Path) -> Result<Defaults> {
    load(path)
}

fn load<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| Error::Template {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yml::from_str(&content).map_err(|e| e.to_string()),
        "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
        "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
        other => Err(format!(
            "unsupported template format '{other}' (expected yaml, yml, toml or json)"
        )),
    };

    parsed.map_err(|reason| Error::Template {
        path: path.to_path_buf(),
        reason,
    })
}
