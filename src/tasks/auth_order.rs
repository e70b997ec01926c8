//! Prefer MAB over 802.1X on every dot1x-enabled interface

use super::{configure, interface_block, proposal_record, show};
use crate::parse;
use anyhow::{Context, Result};
use hostkit::Inventory;
use pipeline::{ExecutionMode, ResultRecord, Task, TaskContext, WorkerPool};
use serde_json::json;

/// Host data key holding the dot1x-enabled interfaces
pub const DOT1X_INTERFACES: &str = "dot1x_interfaces";

const AUTH_LINES: &[&str] = &[
    " authentication order mab dot1x",
    " authentication priority mab dot1x",
];

pub struct AuthOrderTask;

fn auth_block(interface: &str) -> Vec<String> {
    interface_block(interface, AUTH_LINES)
}

fn discover(ctx: &mut TaskContext<'_>) -> Result<Vec<String>> {
    let output = show(ctx, "show dot1x all")?;
    let interfaces = parse::dot1x_interfaces(&output);
    ctx.host
        .data
        .insert(DOT1X_INTERFACES.to_string(), json!(interfaces));
    Ok(interfaces)
}

impl Task for AuthOrderTask {
    fn name(&self) -> &str {
        "auth-order"
    }

    fn propose(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>> {
        pool.run(self.name(), inventory, ExecutionMode::Propose, |ctx| {
            let interfaces = discover(ctx)?;
            Ok(proposal_record(ctx, &interfaces, auth_block))
        })
    }

    fn apply(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>> {
        pool.run(self.name(), inventory, ExecutionMode::Apply, |ctx| {
            let interfaces = discover(ctx)?;
            if !interfaces.is_empty() {
                let lines: Vec<String> = interfaces.iter().flat_map(|i| auth_block(i)).collect();
                configure(ctx, &lines).context("updating authentication order failed")?;
            }
            Ok(ctx
                .success()
                .with("interfaces", json!(interfaces))
                .with("configured", interfaces.len()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::PROPOSED_CONFIG;
    use crate::testing::{FakeDevice, fleet, pool};

    fn device() -> FakeDevice {
        FakeDevice::new().respond(
            "show dot1x all",
            "Dot1x Info for GigabitEthernet1/0/2\nDot1x Info for GigabitEthernet1/0/5\n",
        )
    }

    #[test]
    fn test_propose_lists_blocks() {
        let device = device();
        let mut inventory = fleet(&["sw1"]);

        let records = AuthOrderTask.propose(&mut inventory, &pool(&device)).unwrap();

        assert_eq!(
            records[0].get(PROPOSED_CONFIG).unwrap()["Gi1/0/5"],
            json!([
                "interface Gi1/0/5",
                " authentication order mab dot1x",
                " authentication priority mab dot1x"
            ])
        );
        assert_eq!(
            inventory.host("sw1").unwrap().data[DOT1X_INTERFACES],
            json!(["Gi1/0/2", "Gi1/0/5"])
        );
        assert_eq!(device.sent(), vec!["sw1: show dot1x all"]);
    }

    #[test]
    fn test_apply_sends_one_config_session() {
        let device = device();
        let mut inventory = fleet(&["sw1"]);

        let records = AuthOrderTask.apply(&mut inventory, &pool(&device)).unwrap();

        assert_eq!(records[0].get("configured"), Some(&json!(2)));
        let sent = device.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].starts_with("sw1: config: interface Gi1/0/2 | "));
        assert!(sent[1].contains("interface Gi1/0/5"));
    }
}
