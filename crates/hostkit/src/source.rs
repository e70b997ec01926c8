//! Document sources - where raw device records come from
//!
//! A source is addressed by a URI plus database and collection selectors,
//! mirroring a document store. The file-backed source lays collections out as
//! `<root>/<database>/<collection>.json` (a JSON array) or `.jsonl` (one
//! document per line).

use crate::error::{Error, Result};
use crate::model::Record;
use crate::mongo::MongoDocumentSource;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Equality/operator filter applied to documents before loading
///
/// Each criterion is either `field: value` (equality) or an operator object:
/// `{"$in": [..]}`, `{"$ne": value}`, `{"$exists": bool}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(pub Record);

impl Query {
    /// A query that matches every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality criterion
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that every operator is understood
    pub fn validate(&self) -> Result<()> {
        for (field, criterion) in &self.0 {
            if let Some((op, _)) = operator(criterion)
                && !matches!(op, "$in" | "$ne" | "$exists")
            {
                return Err(Error::InvalidQuery(format!(
                    "unsupported operator '{op}' on field '{field}'"
                )));
            }
        }
        Ok(())
    }

    /// Whether a document satisfies every criterion
    pub fn matches(&self, record: &Record) -> bool {
        self.0.iter().all(|(field, criterion)| {
            let actual = record.get(field);
            match operator(criterion) {
                Some(("$in", Value::Array(options))) => {
                    actual.is_some_and(|v| options.contains(v))
                }
                Some(("$ne", expected)) => actual != Some(expected),
                Some(("$exists", Value::Bool(wanted))) => actual.is_some() == *wanted,
                Some(_) => false,
                None => actual == Some(criterion),
            }
        })
    }
}

/// Split `{"$op": arg}` into its parts
fn operator(criterion: &Value) -> Option<(&str, &Value)> {
    let Value::Object(map) = criterion else {
        return None;
    };
    if map.len() != 1 {
        return None;
    }
    map.iter()
        .next()
        .filter(|(key, _)| key.starts_with('$'))
        .map(|(key, arg)| (key.as_str(), arg))
}

/// Something that can return the documents of a collection
pub trait DocumentSource: Send + Sync {
    /// Fetch the documents of `database`/`collection` matching `query`
    ///
    /// A missing collection yields no documents; an unreachable source is an error.
    fn fetch(&self, database: &str, collection: &str, query: &Query) -> Result<Vec<Record>>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Open a source from a URI
///
/// Accepts `mongodb://` and `mongodb+srv://` connection strings,
/// `file://<root>` or a bare filesystem path.
pub fn open(uri: &str) -> Result<Box<dyn DocumentSource>> {
    if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
        return Ok(Box::new(MongoDocumentSource::new(uri)));
    }
    if let Some(path) = uri.strip_prefix("file://") {
        return Ok(Box::new(FileDocumentSource::new(path)));
    }
    if let Some((scheme, _)) = uri.split_once("://") {
        return Err(Error::Source(format!(
            "unsupported document source scheme '{scheme}' in '{uri}'"
        )));
    }
    Ok(Box::new(FileDocumentSource::new(uri)))
}

/// Collections stored as JSON files under a root directory
#[derive(Debug, Clone)]
pub struct FileDocumentSource {
    root: PathBuf,
}

impl FileDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_collection(&self, database: &str, collection: &str) -> Result<Option<Vec<Record>>> {
        let dir = self.root.join(database);

        let json = dir.join(format!("{collection}.json"));
        if json.is_file() {
            let content = fs::read_to_string(&json)?;
            let documents: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
                Error::Source(format!("{} is not a JSON array of documents: {e}", json.display()))
            })?;
            return documents
                .into_iter()
                .enumerate()
                .map(|(i, doc)| into_record(doc, &json, i))
                .collect::<Result<Vec<_>>>()
                .map(Some);
        }

        let jsonl = dir.join(format!("{collection}.jsonl"));
        if jsonl.is_file() {
            let content = fs::read_to_string(&jsonl)?;
            let mut records = Vec::new();
            for (i, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let doc: Value = serde_json::from_str(line).map_err(|e| {
                    Error::Source(format!("{} line {}: {e}", jsonl.display(), i + 1))
                })?;
                records.push(into_record(doc, &jsonl, i)?);
            }
            return Ok(Some(records));
        }

        Ok(None)
    }
}

fn into_record(doc: Value, path: &Path, index: usize) -> Result<Record> {
    match doc {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Source(format!(
            "document #{index} in {} is not an object",
            path.display()
        ))),
    }
}

impl DocumentSource for FileDocumentSource {
    fn fetch(&self, database: &str, collection: &str, query: &Query) -> Result<Vec<Record>> {
        if !self.root.is_dir() {
            return Err(Error::Source(format!(
                "cannot reach document store at {}",
                self.root.display()
            )));
        }
        query.validate()?;

        let Some(records) = self.read_collection(database, collection)? else {
            warn!(
                "collection '{}/{}' not found under {}",
                database,
                collection,
                self.root.display()
            );
            return Ok(Vec::new());
        };

        let total = records.len();
        let matched: Vec<Record> = records.into_iter().filter(|r| query.matches(r)).collect();
        debug!(
            "{}/{}: {} of {} documents matched",
            database,
            collection,
            matched.len(),
            total
        );
        Ok(matched)
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

/// In-memory collections, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentSource {
    collections: BTreeMap<(String, String), Vec<Record>>,
}

impl MemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the documents of one collection
    pub fn insert(
        &mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
        records: Vec<Record>,
    ) {
        self.collections
            .insert((database.into(), collection.into()), records);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_collection(
        mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
        records: Vec<Record>,
    ) -> Self {
        self.insert(database, collection, records);
        self
    }
}

impl DocumentSource for MemoryDocumentSource {
    fn fetch(&self, database: &str, collection: &str, query: &Query) -> Result<Vec<Record>> {
        query.validate()?;
        let key = (database.to_string(), collection.to_string());
        Ok(self
            .collections
            .get(&key)
            .map(|records| records.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
