//! Task context and reporter traits
//!
//! These traits keep the pipeline free of any particular terminal UI; the
//! binary supplies its own reporter.

use crate::pool::TransportFactory;
use crate::source::InventoryProposal;
use crate::types::{ExecutionMode, ResultRecord, RunSummary};
use anyhow::{Context as _, Result};
use hostkit::{CommandTransport, Data, ExtensionCall, Host};
use serde_json::Value;

/// Receives progress and summary output during a run
///
/// Methods are called from worker threads, so implementations must be `Sync`.
pub trait Reporter: Send + Sync {
    /// Called before hosts are dispatched
    fn on_start(&self, _task: &str, _hosts: usize, _mode: ExecutionMode) {}

    /// Called as each host finishes
    fn on_host_complete(&self, _record: &ResultRecord) {}

    /// Called after every host has finished
    fn on_finish(&self) {}

    /// Print the default end-of-run summary
    fn summary(
        &self,
        task: &str,
        mode: ExecutionMode,
        summary: &RunSummary,
        records: &[ResultRecord],
    );

    /// Print an inventory proposal
    fn proposal(&self, proposal: &InventoryProposal);
}

/// Reporter that prints nothing
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn summary(
        &self,
        _task: &str,
        _mode: ExecutionMode,
        _summary: &RunSummary,
        _records: &[ResultRecord],
    ) {
    }

    fn proposal(&self, _proposal: &InventoryProposal) {}
}

/// What a task sees while running against one host
///
/// The device connection is opened on first use and closed when the context
/// is dropped, so hosts a task never talks to never get a connection.
pub struct TaskContext<'a> {
    pub host: &'a mut Host,
    pub mode: ExecutionMode,
    transport: Option<Box<dyn CommandTransport>>,
    factory: &'a TransportFactory,
}

impl<'a> TaskContext<'a> {
    pub fn new(host: &'a mut Host, mode: ExecutionMode, factory: &'a TransportFactory) -> Self {
        Self {
            host,
            mode,
            transport: None,
            factory,
        }
    }

    pub fn name(&self) -> &str {
        self.host.name()
    }

    /// A success record for this host
    pub fn success(&self) -> ResultRecord {
        ResultRecord::success(self.host.name())
    }

    fn ensure_transport(
        slot: &mut Option<Box<dyn CommandTransport>>,
        factory: &TransportFactory,
        host: &Host,
    ) -> Result<()> {
        if slot.is_none() {
            let transport = factory(host)
                .with_context(|| format!("failed to connect to '{}'", host.name()))?;
            *slot = Some(transport);
        }
        Ok(())
    }

    /// The host's open device connection
    pub fn transport(&mut self) -> Result<&mut dyn CommandTransport> {
        Self::ensure_transport(&mut self.transport, self.factory, self.host)?;
        match self.transport.as_deref_mut() {
            Some(transport) => Ok(transport),
            None => anyhow::bail!("no transport for '{}'", self.host.name()),
        }
    }

    /// Run a host extension with the device connection attached
    ///
    /// An unregistered name fails before any connection is opened.
    pub fn run_extension(&mut self, name: &str, args: Data) -> Result<Value> {
        self.host.extension(name)?;
        Self::ensure_transport(&mut self.transport, self.factory, self.host)?;

        let call = match self.transport.as_deref_mut() {
            Some(transport) => ExtensionCall::with_transport(args, transport),
            None => ExtensionCall::new(args),
        };
        self.host.run_extension(name, call)
    }

    /// Close the device connection, if one was opened
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }
}

impl Drop for TaskContext<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
