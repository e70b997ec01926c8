//! Task trait

use crate::pool::WorkerPool;
use crate::types::{ExecutionMode, ResultRecord};
use anyhow::Result;
use hostkit::Inventory;

/// A unit of work run against every host of an inventory
///
/// Implementations usually hand a per-host closure to [`WorkerPool::run`].
/// `propose` must not change device state; it may stash findings on hosts
/// for a later `apply`.
pub trait Task: Send + Sync {
    /// Identifier used in logs and summaries
    fn name(&self) -> &str;

    /// Report what the task would do
    fn propose(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>>;

    /// Make the changes
    fn apply(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>>;

    /// Dispatch to `propose` or `apply`
    fn run(
        &self,
        mode: ExecutionMode,
        inventory: &mut Inventory,
        pool: &WorkerPool,
    ) -> Result<Vec<ResultRecord>> {
        match mode {
            ExecutionMode::Propose => self.propose(inventory, pool),
            ExecutionMode::Apply => self.apply(inventory, pool),
        }
    }
}
