//! Persist the running configuration of every host

use crate::extensions;
use anyhow::Result;
use hostkit::{Data, Inventory};
use log::info;
use pipeline::{ExecutionMode, ResultRecord, Task, WorkerPool};

pub struct SaveConfigsTask;

impl Task for SaveConfigsTask {
    fn name(&self) -> &str {
        "save-configs"
    }

    /// Nothing to preview; reports the hosts a save would touch
    fn propose(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>> {
        info!("save-configs has no proposal; listing hosts that would be saved");
        pool.run(self.name(), inventory, ExecutionMode::Propose, |ctx| {
            Ok(ctx.success().with("action", "save"))
        })
    }

    fn apply(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>> {
        pool.run(self.name(), inventory, ExecutionMode::Apply, |ctx| {
            let output = ctx.run_extension(extensions::SAVE_CONFIG, Data::new())?;
            Ok(ctx.success().with("action", "save").with("output", output))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDevice, fleet, pool};
    use serde_json::json;

    #[test]
    fn test_propose_saves_nothing() {
        let device = FakeDevice::new();
        let mut inventory = fleet(&["sw1", "sw2"]);

        let records = SaveConfigsTask.propose(&mut inventory, &pool(&device)).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.get("action") == Some(&json!("save"))));
        assert!(device.sent().is_empty());
    }

    #[test]
    fn test_apply_saves_each_host() {
        let device = FakeDevice::new();
        let mut inventory = fleet(&["sw1", "sw2", "nop-1"]);

        let records = SaveConfigsTask.apply(&mut inventory, &pool(&device)).unwrap();

        assert_eq!(records.iter().filter(|r| !r.failed).count(), 2);
        assert_eq!(records[0].host, "nop-1");
        assert!(records[0].failed);
        assert_eq!(records[1].get("output"), Some(&json!("[OK]")));

        let mut sent = device.sent();
        sent.sort();
        assert_eq!(sent, vec!["sw1: save", "sw2: save"]);
    }
}
