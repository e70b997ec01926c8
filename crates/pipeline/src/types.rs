//! Core types for pipeline runs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Whether a run only reports what it would do, or does it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Report intended changes without touching devices
    #[default]
    Propose,
    /// Make the changes
    Apply,
}

impl ExecutionMode {
    pub fn is_apply(self) -> bool {
        matches!(self, Self::Apply)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Propose => write!(f, "proposal"),
            Self::Apply => write!(f, "apply"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "propose" | "proposal" => Ok(Self::Propose),
            "apply" => Ok(Self::Apply),
            other => Err(format!(
                "unknown execution mode '{other}' (expected propose or apply)"
            )),
        }
    }
}

/// Outcome of one task invocation on one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub host: String,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Task-specific output
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResultRecord {
    pub fn success(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            failed: false,
            error: None,
            fields: Map::new(),
        }
    }

    /// A failed record carrying the whole error chain
    pub fn failure(host: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::failed_with(host, format!("{error:#}"))
    }

    pub fn failed_with(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            failed: true,
            error: Some(message.into()),
            fields: Map::new(),
        }
    }

    /// Attach a task-specific field
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Counts of per-host outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_records(records: &[ResultRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.add_record(record);
        }
        summary
    }

    pub fn add_record(&mut self, record: &ResultRecord) {
        if record.failed {
            self.failed += 1;
        } else {
            self.succeeded += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// True when no host failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// A post-processor that failed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProcessorFailure {
    pub name: String,
    pub error: String,
}

/// Everything a completed run produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub task: String,
    pub mode: ExecutionMode,
    pub summary: RunSummary,
    pub records: Vec<ResultRecord>,
    pub post_processor_failures: Vec<PostProcessorFailure>,
}

impl RunReport {
    pub fn failed_hosts(&self) -> impl Iterator<Item = &ResultRecord> {
        self.records.iter().filter(|r| r.failed)
    }
}
