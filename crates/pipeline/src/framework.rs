//! Execution framework - composes source, filter, task and sinks into one run
//!
//! A run goes:
//! 1. build the inventory from the source
//! 2. narrow it with the filter, if any
//! 3. dispatch the task in the configured mode
//! 4. print the default summary
//! 5. hand the records to each post-processor, in order
//!
//! A failing post-processor is logged and recorded in the [`RunReport`]; the
//! remaining post-processors still run.

use crate::filter::Filter;
use crate::pool::WorkerPool;
use crate::post::PostProcessor;
use crate::source::{InventoryProposal, InventorySource};
use crate::task::Task;
use crate::types::{ExecutionMode, PostProcessorFailure, RunReport, RunSummary};
use anyhow::{Context as _, Result};
use hostkit::Inventory;
use log::{error, info};

pub struct ExecutionFramework {
    source: Box<dyn InventorySource>,
    filter: Option<Box<dyn Filter>>,
    task: Box<dyn Task>,
    mode: ExecutionMode,
    post_processors: Vec<Box<dyn PostProcessor>>,
    pool: WorkerPool,
}

impl ExecutionFramework {
    pub fn new(source: Box<dyn InventorySource>, task: Box<dyn Task>, pool: WorkerPool) -> Self {
        Self {
            source,
            filter: None,
            task,
            mode: ExecutionMode::default(),
            post_processors: Vec::new(),
            pool,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_post_processor(mut self, post: Box<dyn PostProcessor>) -> Self {
        self.post_processors.push(post);
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    fn filtered_inventory(&self) -> Result<Inventory> {
        let inventory = self
            .source
            .inventory()
            .context("Failed to build inventory")?;
        let total = inventory.len();

        let inventory = match &self.filter {
            Some(filter) => filter.apply(inventory),
            None => inventory,
        };
        info!("{} of {} hosts selected", inventory.len(), total);
        Ok(inventory)
    }

    /// Run the task over the filtered inventory
    pub fn execute(&self) -> Result<RunReport> {
        let inventory = self.filtered_inventory()?;
        self.execute_on(inventory)
    }

    /// Show the inventory proposal, then run only if `confirm` accepts it
    ///
    /// The inventory is built once, so the hosts that run are exactly the
    /// hosts that were proposed. Returns `None` when declined.
    pub fn execute_confirmed<F>(&self, confirm: F) -> Result<Option<RunReport>>
    where
        F: FnOnce(&InventoryProposal) -> Result<bool>,
    {
        let inventory = self.filtered_inventory()?;
        let proposal = self.proposal_for(&inventory)?;
        if !confirm(&proposal)? {
            info!("run of {} declined", self.task.name());
            return Ok(None);
        }
        self.execute_on(inventory).map(Some)
    }

    fn execute_on(&self, mut inventory: Inventory) -> Result<RunReport> {
        let task = self.task.name().to_string();

        info!("running {} in {} mode", task, self.mode);
        let records = self
            .task
            .run(self.mode, &mut inventory, &self.pool)
            .with_context(|| format!("Task '{task}' failed"))?;

        let summary = RunSummary::from_records(&records);
        self.pool
            .reporter()
            .summary(&task, self.mode, &summary, &records);

        let mut failures = Vec::new();
        for post in &self.post_processors {
            if let Err(e) = post.process(&records) {
                error!("post-processor '{}' failed: {:#}", post.name(), e);
                failures.push(PostProcessorFailure {
                    name: post.name().to_string(),
                    error: format!("{e:#}"),
                });
            }
        }

        Ok(RunReport {
            task,
            mode: self.mode,
            summary,
            records,
            post_processor_failures: failures,
        })
    }

    /// Describe the inventory the source resolves to, without running the task
    pub fn propose_inventory(&self) -> Result<InventoryProposal> {
        let inventory = self.filtered_inventory()?;
        self.proposal_for(&inventory)
    }

    fn proposal_for(&self, inventory: &Inventory) -> Result<InventoryProposal> {
        let proposal = self.source.propose_inventory(inventory)?;
        self.pool.reporter().proposal(&proposal);
        Ok(proposal)
    }
}
