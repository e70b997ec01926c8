//! Run a fixed list of exec-mode commands on every host

use super::show;
use anyhow::{Context, Result};
use hostkit::{Data, Inventory};
use pipeline::{ExecutionMode, ResultRecord, Task, WorkerPool};
use serde_json::{Value, json};

/// Host data key the collected outputs are stored under
pub const OUTPUTS: &str = "command_outputs";

pub struct CommandTask {
    commands: Vec<String>,
}

impl CommandTask {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }
}

impl Task for CommandTask {
    fn name(&self) -> &str {
        "command"
    }

    fn propose(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>> {
        pool.run(self.name(), inventory, ExecutionMode::Propose, |ctx| {
            Ok(ctx.success().with("commands", json!(self.commands)))
        })
    }

    fn apply(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>> {
        pool.run(self.name(), inventory, ExecutionMode::Apply, |ctx| {
            let mut outputs = Data::new();
            for command in &self.commands {
                let output = show(ctx, command).with_context(|| format!("'{command}' failed"))?;
                outputs.insert(command.clone(), Value::String(output));
            }

            ctx.host
                .data
                .insert(OUTPUTS.to_string(), Value::Object(outputs.clone()));
            Ok(ctx.success().with("outputs", Value::Object(outputs)))
        })
    }
}
