//! # Pipeline
//!
//! Runs a task concurrently over every host of a resolved inventory.
//!
//! ## Core Concepts
//!
//! - **InventorySource**: builds the [`Inventory`](hostkit::Inventory) for a run
//! - **Filter**: narrows the inventory before the task runs
//! - **Task**: per-host work, in propose or apply mode
//! - **WorkerPool**: fixed-size thread pool; one [`ResultRecord`] per host,
//!   with errors and panics contained to the host they happened on
//! - **PostProcessor**: result sinks run after the task, in order
//! - **ExecutionFramework**: composes all of the above into one run
//!
//! ## Provider Traits
//!
//! - [`Reporter`]: receives progress and prints summaries
//! - [`TransportFactory`]: opens a device connection for a host
//!
//! The crate prints nothing on its own; the binary chooses a reporter.

pub mod context;
pub mod filter;
pub mod framework;
pub mod pool;
pub mod post;
pub mod source;
pub mod task;
pub mod types;

// Re-export main types at crate root
pub use context::{Reporter, SilentReporter, TaskContext};
pub use filter::{FieldFilter, Filter};
pub use framework::ExecutionFramework;
pub use pool::{TransportFactory, WorkerPool};
pub use post::{
    JsonFilePostProcessor, MongoPostProcessor, PostProcessor, PrintPostProcessor,
    SpreadsheetPostProcessor, SqlitePostProcessor,
};
pub use source::{InventoryProposal, InventorySource, ProposedHost};
pub use task::Task;
pub use types::{ExecutionMode, PostProcessorFailure, ResultRecord, RunReport, RunSummary};
