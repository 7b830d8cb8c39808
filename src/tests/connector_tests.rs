// src/tests/connector_tests.rs

use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

use crate::config::{ConnectorConfig, RetryConfig};
use crate::connector::RemoteConnector;
use crate::resilience::{FetchOutcome, HandleState, HealthStatus, Sleeper};
use crate::test_utils::{
    fatal_error, network_error, test_endpoint, MockConnector, MockOperation, RecordingSleeper,
};

fn test_config() -> ConnectorConfig {
    ConnectorConfig {
        connect: RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(10),
            ..RetryConfig::default()
        },
        query: RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
            ..RetryConfig::default()
        },
        ..ConnectorConfig::default()
    }
}

fn build(
    connector: MockConnector,
    sleeper: &Arc<RecordingSleeper>,
) -> RemoteConnector<MockConnector> {
    RemoteConnector::with_sleeper(
        connector,
        test_endpoint(),
        &test_config(),
        Arc::clone(sleeper) as Arc<dyn Sleeper>,
    )
}

#[tokio::test]
async fn test_uninitialized_connector_degrades() {
    let sleeper = RecordingSleeper::new();
    let remote = build(MockConnector::succeeding(), &sleeper);
    let operation = MockOperation::returning(vec![1]);

    assert_eq!(remote.state(), HandleState::Uninitialized);
    assert!(remote.fetch(&operation).await.is_empty());
    assert_eq!(operation.calls(), 0);

    let verdict = remote.health(&operation).await;
    assert_eq!(verdict.status, HealthStatus::Degraded);
    assert!(!verdict.handle_present);
    assert_eq!(remote.connector().attempts(), 0);
}

#[tokio::test]
async fn test_full_lifecycle_with_flaky_startup() {
    let sleeper = RecordingSleeper::new();
    let remote = build(MockConnector::failing_times(2, network_error), &sleeper);

    assert_eq!(remote.initialize().await, HandleState::Connected);
    assert_eq!(remote.connector().attempts(), 3);
    assert_eq!(
        sleeper.sleeps(),
        vec![Duration::from_millis(10), Duration::from_millis(20)]
    );

    let operation = MockOperation::returning(vec![4, 5]);
    assert_eq!(remote.fetch(&operation).await, vec![4, 5]);

    let verdict = remote.health(&operation).await;
    assert_eq!(verdict.status, HealthStatus::Healthy);
    assert!(verdict.handle_present && verdict.probe_ok);
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let sleeper = RecordingSleeper::new();
    let remote = build(MockConnector::succeeding(), &sleeper);

    let first = remote.initialize().await;
    let handle = remote.handle().unwrap();
    let second = remote.initialize().await;

    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&handle, &remote.handle().unwrap()));
    assert_eq!(remote.connector().attempts(), 1);
}

#[tokio::test]
async fn test_absent_after_exhaustion() {
    let sleeper = RecordingSleeper::new();
    let remote = build(MockConnector::always_failing(network_error), &sleeper);

    assert_eq!(remote.initialize().await, HandleState::Absent);
    assert_eq!(remote.connector().attempts(), 5);
    assert_eq!(sleeper.count(), 4);

    let operation = MockOperation::returning(vec![1]);
    assert!(matches!(
        remote.fetch_outcome(&operation).await,
        FetchOutcome::NoHandle
    ));
    assert_eq!(sleeper.count(), 4, "absent handle adds no sleeps");
}

#[tokio::test]
async fn test_fatal_startup_error_is_absent_after_one_attempt() {
    let sleeper = RecordingSleeper::new();
    let remote = build(MockConnector::always_failing(fatal_error), &sleeper);

    assert_eq!(remote.initialize().await, HandleState::Absent);
    assert_eq!(remote.connector().attempts(), 1);
    assert_eq!(sleeper.count(), 0);
}

#[tokio::test]
async fn test_failed_fetch_distinguished_from_empty() {
    let sleeper = RecordingSleeper::new();
    let remote = build(MockConnector::succeeding(), &sleeper);
    remote.initialize().await;

    let empty = MockOperation::returning(Vec::new());
    let broken = MockOperation::always_failing(network_error);

    assert!(remote.fetch_outcome(&empty).await.is_success());
    assert!(!remote.fetch_outcome(&broken).await.is_success());
    // both look the same through the collapsed contract
    assert_eq!(remote.fetch(&empty).await, remote.fetch(&broken).await);
}

#[tokio::test]
async fn test_health_probe_uses_single_attempt_by_default() {
    let sleeper = RecordingSleeper::new();
    let remote = build(MockConnector::succeeding(), &sleeper);
    remote.initialize().await;

    let probe = MockOperation::always_failing(network_error);
    let verdict = remote.health(&probe).await;

    assert_eq!(verdict.status, HealthStatus::Degraded);
    assert!(verdict.handle_present);
    assert_eq!(probe.calls(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_lifecycle_is_logged() {
    let sleeper = RecordingSleeper::new();
    let remote = build(MockConnector::failing_times(1, network_error), &sleeper);

    remote.initialize().await;
    let _ = remote.health(&MockOperation::returning(vec![1])).await;

    assert!(logs_contain("Attempt failed, backing off"));
    assert!(logs_contain("Client handle created"));
    assert!(logs_contain("Health verdict"));
}
