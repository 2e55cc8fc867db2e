//! Fan-out engine
//!
//! Fetches the station snapshot of every catalog network and reduces the
//! per-network outcomes into one table.
//!
//! # Overview
//!
//! The engine module provides:
//! - `FanOut` - Sequential or bounded-parallel execution of station fetches
//! - `FanOutConfig` - Capacity, per-task timeout, failure policy, result order
//! - `FanOutReport` - Combined table plus succeeded / failed networks
//!
//! Outcomes land in a slot list indexed by submission order, so the
//! combined table never depends on shared mutable state.

mod types;

pub use types::{
    FailedNetwork, FailurePolicy, FanOutConfig, FanOutReport, FetchMode, ResultOrder,
    TaskOutcome,
};

use crate::citybikes::CityBikesClient;
use crate::error::{Error, Result};
use crate::output::{concat_tables, station_schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Anything that can produce one network's station table
#[async_trait]
pub trait StationSource: Send + Sync + 'static {
    async fn fetch_stations(&self, network_id: &str) -> Result<RecordBatch>;
}

#[async_trait]
impl StationSource for CityBikesClient {
    async fn fetch_stations(&self, network_id: &str) -> Result<RecordBatch> {
        CityBikesClient::fetch_stations(self, network_id).await
    }
}

/// Fan-out orchestrator
pub struct FanOut<S> {
    source: Arc<S>,
    config: FanOutConfig,
}

impl<S: StationSource> FanOut<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            config: FanOutConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: FanOutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FanOutConfig {
        &self.config
    }

    /// Fetch every network and concatenate the successful tables
    ///
    /// Under [`FailurePolicy::Abort`] the first failure cancels the
    /// remaining work and is returned as [`Error::NetworkFetch`].
    pub async fn run(&self, network_ids: &[String]) -> Result<FanOutReport> {
        let start = Instant::now();
        info!(
            "Fetching stations for {} networks ({:?}, capacity {})",
            network_ids.len(),
            self.config.mode,
            self.config.capacity
        );

        let completed = match self.config.mode {
            FetchMode::Sequential => self.run_sequential(network_ids).await?,
            FetchMode::Parallel => self.run_parallel(network_ids).await?,
        };

        self.reduce(network_ids, completed, start.elapsed())
    }

    async fn run_sequential(&self, network_ids: &[String]) -> Result<Vec<TaskOutcome>> {
        let mut completed = Vec::with_capacity(network_ids.len());
        for (index, network_id) in network_ids.iter().enumerate() {
            let outcome = fetch_one(
                Arc::clone(&self.source),
                index,
                network_id.clone(),
                self.config.task_timeout,
            )
            .await;
            self.check_abort(&outcome)?;
            completed.push(outcome);
        }
        Ok(completed)
    }

    async fn run_parallel(&self, network_ids: &[String]) -> Result<Vec<TaskOutcome>> {
        let capacity = self.config.capacity.max(1);
        let semaphore = Arc::new(Semaphore::new(capacity));
        let (tx, mut rx) = mpsc::channel::<TaskOutcome>(capacity);
        let mut workers = JoinSet::new();

        for (index, network_id) in network_ids.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let network_id = network_id.clone();
            let timeout = self.config.task_timeout;

            workers.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetch_one(source, index, network_id, timeout).await,
                    Err(e) => TaskOutcome {
                        index,
                        network_id,
                        result: Err(Error::Worker {
                            message: format!("Worker pool closed: {e}"),
                        }),
                        elapsed: Duration::ZERO,
                    },
                };
                // Receiver only goes away when the fan-out aborts
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut completed = Vec::with_capacity(network_ids.len());
        while let Some(outcome) = rx.recv().await {
            if let Err(e) = self.check_abort(&outcome) {
                workers.abort_all();
                return Err(e);
            }
            completed.push(outcome);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("Station worker did not finish: {e}");
                if self.config.failure_policy == FailurePolicy::Abort {
                    workers.abort_all();
                    return Err(Error::Worker {
                        message: format!("Station worker did not finish: {e}"),
                    });
                }
            }
        }

        Ok(completed)
    }

    fn check_abort(&self, outcome: &TaskOutcome) -> Result<()> {
        match (&outcome.result, self.config.failure_policy) {
            (Err(e), FailurePolicy::Abort) => {
                warn!(
                    "Aborting fan-out: network {} failed: {}",
                    outcome.network_id, e
                );
                Err(Error::network_fetch(&outcome.network_id, e.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Slot outcomes by submission index and concatenate in the configured order
    fn reduce(
        &self,
        network_ids: &[String],
        completed: Vec<TaskOutcome>,
        duration: Duration,
    ) -> Result<FanOutReport> {
        let completion_order: Vec<usize> = completed.iter().map(|o| o.index).collect();
        let mut slots: Vec<Option<TaskOutcome>> = network_ids.iter().map(|_| None).collect();
        for outcome in completed {
            let index = outcome.index;
            slots[index] = Some(outcome);
        }

        let mut failed = Vec::new();
        let mut tables: Vec<Option<(String, RecordBatch)>> = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(TaskOutcome {
                    network_id,
                    result: Ok(table),
                    elapsed,
                    ..
                }) => {
                    debug!(
                        "Network {} returned {} stations in {:?}",
                        network_id,
                        table.num_rows(),
                        elapsed
                    );
                    tables.push(Some((network_id, table)));
                }
                Some(TaskOutcome {
                    network_id,
                    result: Err(e),
                    ..
                }) => {
                    warn!("Skipping network {network_id}: {e}");
                    failed.push(FailedNetwork {
                        network_id,
                        error: e.to_string(),
                    });
                    tables.push(None);
                }
                None => {
                    let network_id = network_ids[index].clone();
                    warn!("Skipping network {network_id}: worker produced no outcome");
                    failed.push(FailedNetwork {
                        network_id,
                        error: "worker produced no outcome".to_string(),
                    });
                    tables.push(None);
                }
            }
        }

        let order: Vec<usize> = match self.config.order {
            ResultOrder::Submission => (0..tables.len()).collect(),
            ResultOrder::Completion => completion_order,
        };

        let mut succeeded = Vec::new();
        let mut batches = Vec::new();
        let mut rows_per_network = BTreeMap::new();
        for index in order {
            if let Some((network_id, table)) = tables[index].take() {
                *rows_per_network.entry(network_id.clone()).or_insert(0) += table.num_rows();
                succeeded.push(network_id);
                batches.push(table);
            }
        }

        let table = concat_tables(&station_schema(), &batches)?;
        info!(
            "Fan-out finished in {:?}: {} networks, {} failed, {} station rows",
            duration,
            succeeded.len(),
            failed.len(),
            table.num_rows()
        );

        Ok(FanOutReport {
            table,
            succeeded,
            failed,
            rows_per_network,
            duration,
        })
    }
}

/// Fetch one network under the per-task timeout
///
/// A panicking source becomes an [`Error::Worker`] outcome, so the failure
/// policy sees it like any other failed fetch.
async fn fetch_one<S: StationSource>(
    source: Arc<S>,
    index: usize,
    network_id: String,
    timeout: Duration,
) -> TaskOutcome {
    let start = Instant::now();
    let fetch = AssertUnwindSafe(source.fetch_stations(&network_id)).catch_unwind();
    let result = match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(Error::Worker {
            message: format!("Station fetch panicked: {}", panic_message(panic.as_ref())),
        }),
        Err(_) => Err(Error::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    };

    TaskOutcome {
        index,
        network_id,
        result,
        elapsed: start.elapsed(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests;
