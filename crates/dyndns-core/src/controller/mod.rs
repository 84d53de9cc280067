//! Controller: drives the reconciler from a work queue
//!
//! The controller seeds the queue with every known record, forwards change
//! notifications from the record store, and runs a fixed pool of workers.
//! Each worker takes one key at a time, so a record is never reconciled by
//! two workers concurrently while distinct records proceed in parallel.
//!
//! Cycle results map to queue operations:
//!
//! | Result                           | Queue operation        |
//! |----------------------------------|------------------------|
//! | `Ok(Action)` with a delay        | `add_after(delay)`     |
//! | `Ok(Action)` terminal            | nothing                |
//! | `Err` with `retry_after()`       | `add_after(retry)`     |
//! | any other `Err` or timeout       | `add_rate_limited`     |

pub mod queue;

pub use queue::WorkQueue;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::engine::Reconciler;
use crate::error::{Error, Result};
use crate::model::RecordKey;

/// Work-queue driven controller
pub struct Controller {
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    workers: usize,
    cycle_timeout: Duration,
}

impl Controller {
    /// Create a controller around a reconciler
    pub fn new(reconciler: Arc<Reconciler>, config: &WorkerConfig) -> Self {
        Self {
            reconciler,
            queue: Arc::new(WorkQueue::new(config.backoff_base(), config.backoff_max())),
            workers: config.workers.max(1),
            cycle_timeout: config.cycle_timeout(),
        }
    }

    /// The queue shared with the workers
    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Run until `shutdown` fires
    ///
    /// On shutdown the queue stops handing out keys; cycles already in
    /// progress are allowed to finish.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The initial record listing failed
    pub async fn run(&self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        // Subscribe before listing so a change between the two is not lost
        let mut changes = self.reconciler.records().watch();

        let keys = self.reconciler.records().list_keys().await?;
        info!(records = keys.len(), workers = self.workers, "controller starting");
        for key in keys {
            self.queue.add(key);
        }

        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(run_worker(
                id,
                self.reconciler.clone(),
                self.queue.clone(),
                self.cycle_timeout,
            ));
        }

        loop {
            tokio::select! {
                Some(key) = changes.next() => {
                    debug!(key = %key, "record changed");
                    self.queue.add(key);
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.queue.shutdown();
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task failed");
            }
        }
        info!("controller stopped");

        Ok(())
    }
}

async fn run_worker(id: usize, reconciler: Arc<Reconciler>, queue: Arc<WorkQueue>, cycle_timeout: Duration) {
    debug!(worker = id, "worker started");

    while let Some(key) = queue.get().await {
        let result = tokio::time::timeout(cycle_timeout, reconciler.reconcile(&key, Utc::now()))
            .await
            .unwrap_or_else(|_| {
                Err(Error::timeout(format!(
                    "cycle for {} exceeded {}s",
                    key,
                    cycle_timeout.as_secs()
                )))
            });

        handle_result(&queue, &key, result);
        queue.done(&key);
    }

    debug!(worker = id, "worker stopped");
}

fn handle_result(queue: &WorkQueue, key: &RecordKey, result: Result<crate::engine::Action>) {
    match result {
        Ok(action) => {
            queue.forget(key);
            if let Some(after) = action.requeue_after() {
                queue.add_after(key.clone(), after);
            }
        }
        Err(e) => match e.retry_after() {
            Some(after) => {
                warn!(key = %key, error = %e, retry_after_secs = after.as_secs(), "cycle failed, retrying");
                queue.add_after(key.clone(), after);
            }
            None => {
                let delay = queue.add_rate_limited(key.clone());
                error!(key = %key, error = %e, backoff_ms = delay.as_millis() as u64, "cycle failed, backing off");
            }
        },
    }
}
