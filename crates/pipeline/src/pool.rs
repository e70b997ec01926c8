//! Worker pool - runs one task invocation per host in parallel
//!
//! Every host in the inventory yields exactly one [`ResultRecord`]. Errors and
//! panics inside a host's invocation become failed records for that host and
//! never affect the others.

use crate::context::{Reporter, SilentReporter, TaskContext};
use crate::types::{ExecutionMode, ResultRecord};
use anyhow::{Context as _, Result};
use hostkit::{CommandTransport, Host, Inventory};
use log::{debug, warn};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// Opens a device connection for a host
pub type TransportFactory =
    Arc<dyn Fn(&Host) -> Result<Box<dyn CommandTransport>> + Send + Sync>;

/// Fixed-size pool of workers shared by every task in a run
pub struct WorkerPool {
    workers: usize,
    transports: TransportFactory,
    reporter: Arc<dyn Reporter>,
}

impl WorkerPool {
    pub const DEFAULT_WORKERS: usize = 20;

    pub fn new(workers: usize, transports: TransportFactory) -> Self {
        Self {
            workers: workers.max(1),
            transports,
            reporter: Arc::new(SilentReporter),
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    /// Run `work` once per host, `workers` hosts at a time
    ///
    /// Each invocation gets exclusive access to its own host. Records come back
    /// sorted by host name.
    pub fn run<F>(
        &self,
        task: &str,
        inventory: &mut Inventory,
        mode: ExecutionMode,
        work: F,
    ) -> Result<Vec<ResultRecord>>
    where
        F: Fn(&mut TaskContext<'_>) -> Result<ResultRecord> + Sync,
    {
        let results: Arc<Mutex<Vec<ResultRecord>>> =
            Arc::new(Mutex::new(Vec::with_capacity(inventory.len())));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .context("Failed to create worker pool")?;

        debug!(
            "running '{}' ({}) on {} hosts with {} workers",
            task,
            mode,
            inventory.len(),
            self.workers
        );
        self.reporter.on_start(task, inventory.len(), mode);

        pool.install(|| {
            inventory.hosts.par_iter_mut().for_each(|(name, host)| {
                let record = self.run_host(task, name, host, mode, &work);
                self.reporter.on_host_complete(&record);
                push_record(&results, record);
            });
        });

        self.reporter.on_finish();

        let mut records = into_records(results)?;
        records.sort_by(|a, b| a.host.cmp(&b.host));
        Ok(records)
    }

    fn run_host<F>(
        &self,
        task: &str,
        name: &str,
        host: &mut Host,
        mode: ExecutionMode,
        work: &F,
    ) -> ResultRecord
    where
        F: Fn(&mut TaskContext<'_>) -> Result<ResultRecord> + Sync,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = TaskContext::new(host, mode, &self.transports);
            work(&mut ctx)
        }));

        match outcome {
            Ok(Ok(mut record)) => {
                record.host = name.to_string();
                record
            }
            Ok(Err(e)) => {
                warn!("{task} failed on {name}: {e:#}");
                ResultRecord::failure(name, &e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("{task} panicked on {name}: {message}");
                ResultRecord::failed_with(name, format!("task panicked: {message}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn push_record(results: &Arc<Mutex<Vec<ResultRecord>>>, record: ResultRecord) {
    match results.lock() {
        Ok(mut locked) => locked.push(record),
        Err(poisoned) => poisoned.into_inner().push(record),
    }
}

fn into_records(results: Arc<Mutex<Vec<ResultRecord>>>) -> Result<Vec<ResultRecord>> {
    let mutex = Arc::try_unwrap(results)
        .map_err(|_| anyhow::anyhow!("Failed to collect host results: shared result state"))?;

    match mutex.into_inner() {
        Ok(collected) => Ok(collected),
        Err(poisoned) => Ok(poisoned.into_inner()),
    }
}
