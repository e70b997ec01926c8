//! Bounce 802.1X access ports in one VLAN
//!
//! A port qualifies when `show vlan brief` places it in the configured VLAN
//! and `show dot1x all` lists it. Qualifying ports are stored on the host as
//! `bounce_ports`; apply shuts each one and brings it back up, pausing
//! between ports so clients re-authenticate a few at a time.

use super::{configure, interface_block, proposal_record, show};
use crate::parse;
use anyhow::{Context, Result};
use hostkit::Inventory;
use log::{debug, info};
use pipeline::{ExecutionMode, ResultRecord, Task, TaskContext, WorkerPool};
use serde_json::json;
use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

/// Host data key holding the ports found on the device
pub const BOUNCE_PORTS: &str = "bounce_ports";

pub struct BouncePortsTask {
    vlan: String,
    delay: Duration,
}

impl BouncePortsTask {
    pub fn new(vlan: impl Into<String>, delay: Duration) -> Self {
        Self {
            vlan: vlan.into(),
            delay,
        }
    }

    /// Find qualifying ports and store them on the host
    fn discover(&self, ctx: &mut TaskContext<'_>) -> Result<Vec<String>> {
        let vlan_brief = show(ctx, "show vlan brief")?;
        let dot1x = show(ctx, "show dot1x all")?;

        let in_vlan: BTreeSet<String> = parse::vlan_interfaces(&vlan_brief, &self.vlan)
            .iter()
            .map(|i| parse::abbreviate_interface(i))
            .collect();

        let mut seen = BTreeSet::new();
        let ports: Vec<String> = parse::dot1x_interfaces(&dot1x)
            .into_iter()
            .filter(|i| in_vlan.contains(i) && seen.insert(i.clone()))
            .collect();

        debug!(
            "{}: {} ports in vlan {}, {} bounce ports",
            ctx.name(),
            in_vlan.len(),
            self.vlan,
            ports.len()
        );
        ctx.host.data.insert(BOUNCE_PORTS.to_string(), json!(ports));
        Ok(ports)
    }
}

fn bounce_block(interface: &str) -> Vec<String> {
    interface_block(interface, &[" shutdown", " no shutdown"])
}

impl Task for BouncePortsTask {
    fn name(&self) -> &str {
        "bounce-ports"
    }

    fn propose(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>> {
        info!(
            "Finding 802.1X interfaces in vlan {} (proposal)",
            self.vlan
        );
        pool.run(self.name(), inventory, ExecutionMode::Propose, |ctx| {
            let ports = self.discover(ctx)?;
            Ok(proposal_record(ctx, &ports, bounce_block))
        })
    }

    fn apply(&self, inventory: &mut Inventory, pool: &WorkerPool) -> Result<Vec<ResultRecord>> {
        info!("Bouncing 802.1X interfaces in vlan {}", self.vlan);
        pool.run(self.name(), inventory, ExecutionMode::Apply, |ctx| {
            let ports = self.discover(ctx)?;

            for (i, port) in ports.iter().enumerate() {
                if i > 0 && !self.delay.is_zero() {
                    thread::sleep(self.delay);
                }
                configure(ctx, &bounce_block(port))
                    .with_context(|| format!("bouncing {port} failed"))?;
                info!("{}: bounced {}", ctx.name(), port);
            }

            Ok(ctx
                .success()
                .with("interfaces", json!(ports))
                .with("bounced", ports.len()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::PROPOSED_CONFIG;
    use crate::testing::{FakeDevice, fleet, pool};

    const VLAN_BRIEF: &str = "\
VLAN Name                             Status    Ports
---- -------------------------------- --------- -------------------------------
1    default                          active    Gi1/0/1
21   USERS                            active    Gi1/0/3, Gi1/0/4,
                                                Gi1/0/6
";

    const DOT1X_ALL: &str = "\
Dot1x Info for GigabitEthernet1/0/1
Dot1x Info for GigabitEthernet1/0/4
Dot1x Info for GigabitEthernet1/0/6
";

    fn device() -> FakeDevice {
        FakeDevice::new()
            .respond("show vlan brief", VLAN_BRIEF)
            .respond("show dot1x all", DOT1X_ALL)
    }

    fn task() -> BouncePortsTask {
        BouncePortsTask::new("21", Duration::ZERO)
    }

    #[test]
    fn test_propose_finds_intersection_and_stores_it() {
        let device = device();
        let mut inventory = fleet(&["sw1"]);

        let records = task().propose(&mut inventory, &pool(&device)).unwrap();

        assert_eq!(records[0].get("interfaces"), Some(&json!(["Gi1/0/4", "Gi1/0/6"])));
        assert_eq!(
            records[0].get(PROPOSED_CONFIG).unwrap()["Gi1/0/4"],
            json!(["interface Gi1/0/4", " shutdown", " no shutdown"])
        );
        assert_eq!(
            inventory.host("sw1").unwrap().data[BOUNCE_PORTS],
            json!(["Gi1/0/4", "Gi1/0/6"])
        );
        assert_eq!(device.sent(), vec!["sw1: show vlan brief", "sw1: show dot1x all"]);
    }

    #[test]
    fn test_apply_bounces_each_port() {
        let device = device();
        let mut inventory = fleet(&["sw1"]);

        let records = task().apply(&mut inventory, &pool(&device)).unwrap();

        assert!(!records[0].failed);
        assert_eq!(records[0].get("bounced"), Some(&json!(2)));
        assert_eq!(
            device.sent()[2..],
            [
                "sw1: config: interface Gi1/0/4 |  shutdown |  no shutdown",
                "sw1: config: interface Gi1/0/6 |  shutdown |  no shutdown",
            ]
        );
    }

    #[test]
    fn test_other_vlan_has_no_ports() {
        let device = device();
        let mut inventory = fleet(&["sw1"]);

        let records = BouncePortsTask::new("30", Duration::ZERO)
            .apply(&mut inventory, &pool(&device))
            .unwrap();

        assert_eq!(records[0].get("bounced"), Some(&json!(0)));
        assert_eq!(device.sent().len(), 2);
    }
}
