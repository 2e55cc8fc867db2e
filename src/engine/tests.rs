//! Tests for the fan-out engine

use super::*;
use crate::output::{stations_to_batch, string_column};
use crate::types::StationSnapshot;
use pretty_assertions::assert_eq;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use test_case::test_case;

// ============================================================================
// Mock Source
// ============================================================================

#[derive(Default)]
struct MockSource {
    rows: HashMap<String, usize>,
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    panics: HashSet<String>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl MockSource {
    fn network(mut self, id: &str, rows: usize, delay_ms: u64) -> Self {
        self.rows.insert(id.to_string(), rows);
        self.delays
            .insert(id.to_string(), Duration::from_millis(delay_ms));
        self
    }

    fn failing(mut self, id: &str) -> Self {
        self.failures.insert(id.to_string());
        self
    }

    fn panicking(mut self, id: &str) -> Self {
        self.panics.insert(id.to_string());
        self
    }
}

#[async_trait]
impl StationSource for MockSource {
    async fn fetch_stations(&self, network_id: &str) -> Result<RecordBatch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics.contains(network_id) {
            panic!("station source crashed on {network_id}");
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(network_id) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failures.contains(network_id) {
            return Err(Error::http_status(500, "Internal Server Error"));
        }

        let count = self.rows.get(network_id).copied().unwrap_or(0);
        let records: Vec<StationSnapshot> = (0..count)
            .map(|i| StationSnapshot {
                network_id: network_id.to_string(),
                station_id: format!("{network_id}-{i}"),
                station_name: None,
                timestamp: None,
                latitude: None,
                longitude: None,
                free_bikes: Some(1),
                empty_slots: Some(1),
            })
            .collect();
        stations_to_batch(&records)
    }
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Three networks whose completion order is the reverse of submission order
fn mixed_delays() -> MockSource {
    MockSource::default()
        .network("slow", 3, 120)
        .network("medium", 2, 60)
        .network("fast", 4, 5)
}

// ============================================================================
// Row Accounting
// ============================================================================

#[test_case(FanOutConfig::new().sequential() ; "sequential")]
#[test_case(FanOutConfig::new().parallel(1) ; "parallel one slot")]
#[test_case(FanOutConfig::new().parallel(100) ; "parallel")]
#[test_case(FanOutConfig::new().parallel(100).with_order(ResultOrder::Completion) ; "completion order")]
#[tokio::test]
async fn test_row_count_is_sum_of_networks(config: FanOutConfig) {
    let fan_out = FanOut::new(Arc::new(mixed_delays())).with_config(config);
    let report = fan_out
        .run(&ids(&["slow", "medium", "fast"]))
        .await
        .unwrap();

    assert_eq!(report.total_rows(), 9);
    assert_eq!(report.rows_per_network.get("slow"), Some(&3));
    assert_eq!(report.rows_per_network.get("medium"), Some(&2));
    assert_eq!(report.rows_per_network.get("fast"), Some(&4));
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_submission_order_is_deterministic() {
    let fan_out = FanOut::new(Arc::new(mixed_delays())).with_config(FanOutConfig::new());
    let report = fan_out
        .run(&ids(&["slow", "medium", "fast"]))
        .await
        .unwrap();

    assert_eq!(report.succeeded, ids(&["slow", "medium", "fast"]));
    let column = string_column(&report.table, "network_id").unwrap();
    let mut seen: Vec<String> = Vec::new();
    for id in column {
        if seen.last() != Some(&id) {
            seen.push(id);
        }
    }
    assert_eq!(seen, ids(&["slow", "medium", "fast"]));
}

#[tokio::test]
async fn test_completion_order_follows_finish_times() {
    let fan_out = FanOut::new(Arc::new(mixed_delays()))
        .with_config(FanOutConfig::new().with_order(ResultOrder::Completion));
    let report = fan_out
        .run(&ids(&["slow", "medium", "fast"]))
        .await
        .unwrap();

    assert_eq!(report.succeeded, ids(&["fast", "medium", "slow"]));
}

#[tokio::test]
async fn test_empty_id_list_yields_empty_table() {
    let fan_out = FanOut::new(Arc::new(MockSource::default()));
    let report = fan_out.run(&[]).await.unwrap();

    assert_eq!(report.total_rows(), 0);
    assert_eq!(report.table.schema(), station_schema());
    assert!(report.succeeded.is_empty());
}

#[tokio::test]
async fn test_capacity_bounds_concurrency() {
    let mut source = MockSource::default();
    for i in 0..12 {
        source = source.network(&format!("n{i}"), 1, 20);
    }
    let source = Arc::new(source);
    let network_ids: Vec<String> = (0..12).map(|i| format!("n{i}")).collect();

    let fan_out = FanOut::new(Arc::clone(&source)).with_config(FanOutConfig::new().parallel(3));
    let report = fan_out.run(&network_ids).await.unwrap();

    assert_eq!(report.total_rows(), 12);
    assert!(source.peak_in_flight.load(Ordering::SeqCst) <= 3);
    assert_eq!(source.calls.load(Ordering::SeqCst), 12);
}

// ============================================================================
// Failure Policy
// ============================================================================

#[test_case(FanOutConfig::new().sequential() ; "sequential")]
#[test_case(FanOutConfig::new().parallel(8) ; "parallel")]
#[tokio::test]
async fn test_skip_policy_lists_failed_networks(config: FanOutConfig) {
    let source = mixed_delays().network("broken", 0, 1).failing("broken");
    let fan_out = FanOut::new(Arc::new(source)).with_config(config);

    let report = fan_out
        .run(&ids(&["slow", "broken", "fast"]))
        .await
        .unwrap();

    assert_eq!(report.total_rows(), 7);
    assert_eq!(report.failed_ids(), vec!["broken"]);
    assert!(report.failed[0].error.contains("500"));
    assert!(!report.rows_per_network.contains_key("broken"));
    assert!(!report.is_complete());
}

#[test_case(FanOutConfig::new().sequential() ; "sequential")]
#[test_case(FanOutConfig::new().parallel(8) ; "parallel")]
#[tokio::test]
async fn test_abort_policy_fails_run(config: FanOutConfig) {
    let source = mixed_delays().network("broken", 0, 1).failing("broken");
    let fan_out =
        FanOut::new(Arc::new(source)).with_config(config.with_failure_policy(FailurePolicy::Abort));

    let err = fan_out
        .run(&ids(&["slow", "broken", "fast"]))
        .await
        .unwrap_err();

    match err {
        Error::NetworkFetch { network_id, message } => {
            assert_eq!(network_id, "broken");
            assert!(message.contains("500"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_sequential_abort_stops_submitting() {
    let source = Arc::new(
        MockSource::default()
            .network("a", 1, 0)
            .network("b", 0, 0)
            .failing("b")
            .network("c", 1, 0),
    );
    let fan_out = FanOut::new(Arc::clone(&source)).with_config(
        FanOutConfig::new()
            .sequential()
            .with_failure_policy(FailurePolicy::Abort),
    );

    assert!(fan_out.run(&ids(&["a", "b", "c"])).await.is_err());
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[test_case(FanOutConfig::new().sequential() ; "sequential")]
#[test_case(FanOutConfig::new().parallel(4) ; "parallel")]
#[tokio::test]
async fn test_panicking_source_aborts_under_abort_policy(config: FanOutConfig) {
    let source = MockSource::default()
        .network("ok", 2, 0)
        .panicking("crash");
    let fan_out =
        FanOut::new(Arc::new(source)).with_config(config.with_failure_policy(FailurePolicy::Abort));

    let err = fan_out.run(&ids(&["ok", "crash"])).await.unwrap_err();

    match err {
        Error::NetworkFetch { network_id, message } => {
            assert_eq!(network_id, "crash");
            assert!(message.contains("panicked"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test_case(FanOutConfig::new().sequential() ; "sequential")]
#[test_case(FanOutConfig::new().parallel(4) ; "parallel")]
#[tokio::test]
async fn test_panicking_source_is_skipped_under_skip_policy(config: FanOutConfig) {
    let source = MockSource::default()
        .network("ok", 2, 0)
        .panicking("crash");
    let fan_out = FanOut::new(Arc::new(source)).with_config(config);

    let report = fan_out.run(&ids(&["ok", "crash"])).await.unwrap();

    assert_eq!(report.total_rows(), 2);
    assert_eq!(report.failed_ids(), vec!["crash"]);
    assert!(report.failed[0].error.contains("station source crashed on crash"));
}

#[tokio::test]
async fn test_task_timeout_is_a_failure() {
    let source = MockSource::default()
        .network("hung", 5, 2_000)
        .network("quick", 2, 1);
    let fan_out = FanOut::new(Arc::new(source)).with_config(
        FanOutConfig::new().with_task_timeout(Duration::from_millis(100)),
    );

    let report = fan_out.run(&ids(&["hung", "quick"])).await.unwrap();

    assert_eq!(report.total_rows(), 2);
    assert_eq!(report.failed_ids(), vec!["hung"]);
    assert!(report.failed[0].error.contains("timeout"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = FanOutConfig::default();
    assert_eq!(config.mode, FetchMode::Parallel);
    assert_eq!(config.capacity, 100);
    assert_eq!(config.task_timeout, Duration::from_secs(60));
    assert_eq!(config.failure_policy, FailurePolicy::Skip);
    assert_eq!(config.order, ResultOrder::Submission);

    assert_eq!(FanOutConfig::new().parallel(0).capacity, 1);
}
