//! Post-processors - result sinks run after a task finishes

use crate::types::ResultRecord;
use anyhow::{Context as _, Result};
use log::debug;
use mongodb::bson::{self, Document};
use mongodb::sync::Client;
use rusqlite::{Connection, params};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Consumes the collected records of a run
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, records: &[ResultRecord]) -> Result<()>;
}

/// Prints one JSON object per record to stdout
pub struct PrintPostProcessor;

impl PrintPostProcessor {
    pub fn write_to(&self, out: &mut dyn Write, records: &[ResultRecord]) -> Result<()> {
        for record in records {
            serde_json::to_writer(&mut *out, record)?;
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl PostProcessor for PrintPostProcessor {
    fn name(&self) -> &str {
        "print"
    }

    fn process(&self, records: &[ResultRecord]) -> Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.write_to(&mut lock, records)
    }
}

/// Writes all records as a pretty JSON array, replacing the file
pub struct JsonFilePostProcessor {
    path: PathBuf,
}

impl JsonFilePostProcessor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PostProcessor for JsonFilePostProcessor {
    fn name(&self) -> &str {
        "json"
    }

    fn process(&self, records: &[ResultRecord]) -> Result<()> {
        ensure_parent(&self.path)?;
        let content = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, content + "\n")
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!("wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Appends records to a `results` table in a SQLite database
pub struct SqlitePostProcessor {
    path: PathBuf,
}

impl SqlitePostProcessor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<Connection> {
        ensure_parent(&self.path)?;
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY,
                recorded_at TEXT NOT NULL,
                host TEXT NOT NULL,
                failed INTEGER NOT NULL,
                record TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_host ON results(host);
            ",
        )?;

        Ok(conn)
    }
}

impl PostProcessor for SqlitePostProcessor {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn process(&self, records: &[ResultRecord]) -> Result<()> {
        let mut conn = self.open()?;
        let now = chrono::Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO results (recorded_at, host, failed, record)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                let json = serde_json::to_string(record)?;
                stmt.execute(params![now, record.host, record.failed, json])?;
            }
        }
        tx.commit()?;

        debug!("stored {} records in {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Inserts each record as a document into a MongoDB collection
pub struct MongoPostProcessor {
    uri: String,
    database: String,
    collection: String,
}

impl MongoPostProcessor {
    pub fn new(
        uri: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            collection: collection.into(),
        }
    }
}

fn documents(records: &[ResultRecord]) -> Result<Vec<Document>> {
    records
        .iter()
        .map(|record| {
            bson::to_document(record)
                .with_context(|| format!("Failed to encode the record for {}", record.host))
        })
        .collect()
}

impl PostProcessor for MongoPostProcessor {
    fn name(&self) -> &str {
        "mongodb"
    }

    fn process(&self, records: &[ResultRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let docs = documents(records)?;

        let client = Client::with_uri_str(&self.uri).context("Invalid MongoDB connection string")?;
        client
            .database(&self.database)
            .collection::<Document>(&self.collection)
            .insert_many(docs)
            .run()
            .with_context(|| {
                format!(
                    "Failed to insert results into {}/{}",
                    self.database, self.collection
                )
            })?;

        debug!(
            "inserted {} records into {}/{}",
            records.len(),
            self.database,
            self.collection
        );
        Ok(())
    }
}

/// Writes records as a CSV sheet, one row per record, replacing the file
///
/// Columns are `host`, `failed`, `error`, then every task field in the order
/// first seen. Missing cells are empty.
pub struct SpreadsheetPostProcessor {
    path: PathBuf,
}

impl SpreadsheetPostProcessor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn columns(records: &[ResultRecord]) -> Vec<String> {
    let mut columns: Vec<String> = ["host", "failed", "error"].map(String::from).into();
    for record in records {
        for key in record.fields.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl PostProcessor for SpreadsheetPostProcessor {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    fn process(&self, records: &[ResultRecord]) -> Result<()> {
        ensure_parent(&self.path)?;
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;

        let columns = columns(records);
        writer.write_record(&columns)?;
        for record in records {
            let row = columns.iter().map(|column| match column.as_str() {
                "host" => record.host.clone(),
                "failed" => record.failed.to_string(),
                "error" => record.error.clone().unwrap_or_default(),
                field => cell(record.get(field)),
            });
            writer.write_record(row)?;
        }
        writer.flush()?;

        debug!("wrote {} rows to {}", records.len(), self.path.display());
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}
