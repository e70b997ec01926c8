//! MongoDB document source
//!
//! The client is created per fetch and dropped afterwards; nothing is pooled
//! between loads.

use crate::error::{Error, Result};
use crate::model::Record;
use crate::source::{DocumentSource, Query};
use log::debug;
use mongodb::bson::{self, Bson, Document};
use mongodb::sync::Client;
use serde_json::Value;

/// Collections in a MongoDB deployment, addressed by a `mongodb://` or
/// `mongodb+srv://` connection string
#[derive(Debug, Clone)]
pub struct MongoDocumentSource {
    uri: String,
}

impl MongoDocumentSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl DocumentSource for MongoDocumentSource {
    fn fetch(&self, database: &str, collection: &str, query: &Query) -> Result<Vec<Record>> {
        query.validate()?;
        let filter = filter_document(query)?;
        let unreachable =
            |e: mongodb::error::Error| Error::Source(format!("{}: {e}", self.describe()));

        let client = Client::with_uri_str(&self.uri).map_err(unreachable)?;
        let cursor = client
            .database(database)
            .collection::<Document>(collection)
            .find(filter)
            .run()
            .map_err(unreachable)?;

        let mut records = Vec::new();
        for (index, doc) in cursor.enumerate() {
            records.push(into_record(doc.map_err(unreachable)?, index)?);
        }
        debug!(
            "{}/{}: {} documents from {}",
            database,
            collection,
            records.len(),
            self.describe()
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        redact(&self.uri)
    }
}

/// The query as a server-side filter
fn filter_document(query: &Query) -> Result<Document> {
    bson::to_document(&query.0).map_err(|e| Error::InvalidQuery(e.to_string()))
}

/// A fetched document as a plain record, without the server-assigned `_id`
fn into_record(mut doc: Document, index: usize) -> Result<Record> {
    doc.remove("_id");
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Source(format!("document #{index} is not an object"))),
    }
}

/// Hide the password of a connection string
fn redact(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => {
            let user = rest[..at].split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***{}", &rest[at..])
        }
        None => uri.to_string(),
    }
}
