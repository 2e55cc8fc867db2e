//! Engine types
//!
//! Policies, configuration and per-task outcomes of the fan-out.

use crate::error::Result;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// How station fetches are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// One network at a time, in input order
    Sequential,
    /// Bounded worker pool of `capacity` slots
    #[default]
    Parallel,
}

/// What a failed network fetch does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log, contribute no rows, keep going
    #[default]
    Skip,
    /// Cancel outstanding work and fail the run
    Abort,
}

/// Order in which per-network tables are concatenated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrder {
    /// Input order of the network ids
    #[default]
    Submission,
    /// Order in which fetches finished
    Completion,
}

/// Configuration for the fan-out
#[derive(Debug, Clone)]
pub struct FanOutConfig {
    pub mode: FetchMode,
    /// Worker slots in parallel mode
    pub capacity: usize,
    /// Upper bound on a single network fetch
    pub task_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub order: ResultOrder,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Parallel,
            capacity: 100,
            task_timeout: Duration::from_secs(60),
            failure_policy: FailurePolicy::Skip,
            order: ResultOrder::Submission,
        }
    }
}

impl FanOutConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One network at a time
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.mode = FetchMode::Sequential;
        self
    }

    /// Worker pool with `capacity` slots (at least one)
    #[must_use]
    pub fn parallel(mut self, capacity: usize) -> Self {
        self.mode = FetchMode::Parallel;
        self.capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: ResultOrder) -> Self {
        self.order = order;
        self
    }
}

/// Result of fetching one network
#[derive(Debug)]
pub struct TaskOutcome {
    /// Submission index
    pub index: usize,
    pub network_id: String,
    pub result: Result<RecordBatch>,
    pub elapsed: Duration,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// A network that contributed no rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedNetwork {
    pub network_id: String,
    pub error: String,
}

/// Reduced result of a fan-out
#[derive(Debug, Clone)]
pub struct FanOutReport {
    /// All successful per-network tables, concatenated
    pub table: RecordBatch,
    /// Successful networks, in concatenation order
    pub succeeded: Vec<String>,
    /// Failed networks, in submission order
    pub failed: Vec<FailedNetwork>,
    pub rows_per_network: BTreeMap<String, usize>,
    pub duration: Duration,
}

impl FanOutReport {
    pub fn total_rows(&self) -> usize {
        self.table.num_rows()
    }

    /// Whether every network was fetched
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.network_id.as_str()).collect()
    }
}
