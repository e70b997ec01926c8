//! Error types for inventory loading and host extension dispatch

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or using an inventory
#[derive(Error, Debug)]
pub enum Error {
    /// The document source could not be reached or read
    #[error("document source error: {0}")]
    Source(String),

    /// A query uses an operator the document sources do not understand
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A record lost (or never had) its `name` field
    #[error("record #{index} has no usable 'name' field after transformations")]
    MissingName { index: usize },

    /// A reserved field holds a value of the wrong shape
    #[error("host '{host}': invalid '{field}': {reason}")]
    InvalidField {
        host: String,
        field: String,
        reason: String,
    },

    /// A group lists a parent that is not defined
    #[error("group '{group}' references undefined parent group '{parent}'")]
    UnknownParentGroup { group: String, parent: String },

    /// Group parents loop back onto themselves
    #[error("group inheritance cycle: {}", .path.join(" -> "))]
    GroupCycle { path: Vec<String> },

    /// Two records resolved to the same host name under the strict policy
    #[error("duplicate host name '{0}'")]
    DuplicateHost(String),

    /// No extension with this name is registered on the host
    #[error("extension '{name}' not found in host '{host}'")]
    ExtensionNotFound { host: String, name: String },

    /// A platform-dependent extension ran on a host without a platform
    #[error("host '{host}': platform must be specified to run '{extension}'")]
    PlatformRequired { host: String, extension: String },

    /// A group or defaults template could not be parsed
    #[error("invalid template {}: {reason}", .path.display())]
    Template { path: PathBuf, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for inventory operations
pub type Result<T> = std::result::Result<T, Error>;
