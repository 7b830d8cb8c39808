// src/resilience/tests/health_checker_tests.rs

use std::time::Duration;

use crate::resilience::{HealthChecker, HealthStatus, ResilientExecutor};
use crate::test_utils::{
    fatal_error, network_error, recording_policy, MockHandle, MockOperation, RecordingSleeper,
};

fn checker(probe_retries: u32, sleeper: &std::sync::Arc<RecordingSleeper>) -> HealthChecker {
    HealthChecker::new(
        ResilientExecutor::new(recording_policy(probe_retries, sleeper)),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_absent_handle_is_degraded() {
    let sleeper = RecordingSleeper::new();
    let checker = checker(1, &sleeper);
    let probe = MockOperation::returning(vec![1]);

    let verdict = checker.check(None::<&MockHandle>, &probe).await;

    assert_eq!(verdict.status, HealthStatus::Degraded);
    assert!(!verdict.handle_present);
    assert!(!verdict.probe_ok);
    assert_eq!(verdict.detail.as_deref(), Some("no client handle"));
    assert_eq!(probe.calls(), 0, "no probe without a handle");
}

#[tokio::test]
async fn test_successful_probe_is_healthy() {
    let sleeper = RecordingSleeper::new();
    let checker = checker(1, &sleeper);
    let probe = MockOperation::returning(vec![1]);
    let handle = MockHandle { id: 0 };

    let verdict = checker.check(Some(&handle), &probe).await;

    assert_eq!(verdict.status, HealthStatus::Healthy);
    assert!(verdict.handle_present);
    assert!(verdict.probe_ok);
    assert!(verdict.detail.is_none());
    assert_eq!(verdict.http_status(), 200);
}

#[tokio::test]
async fn test_probe_with_zero_rows_is_healthy() {
    let sleeper = RecordingSleeper::new();
    let checker = checker(1, &sleeper);
    let probe = MockOperation::returning(Vec::new());
    let handle = MockHandle { id: 0 };

    let verdict = checker.check(Some(&handle), &probe).await;

    assert!(verdict.is_healthy());
    assert!(verdict.probe_ok);
}

#[tokio::test]
async fn test_failing_probe_is_degraded_with_detail() {
    let sleeper = RecordingSleeper::new();
    let checker = checker(1, &sleeper);
    let probe = MockOperation::always_failing(network_error);
    let handle = MockHandle { id: 0 };

    let verdict = checker.check(Some(&handle), &probe).await;

    assert_eq!(verdict.status, HealthStatus::Degraded);
    assert!(verdict.handle_present);
    assert!(!verdict.probe_ok);
    let detail = verdict.detail.clone().unwrap();
    assert!(
        detail.contains("connection refused"),
        "detail was {}",
        detail
    );
    assert_eq!(verdict.http_status(), 503);
}

#[tokio::test]
async fn test_checker_adds_no_retries_of_its_own() {
    let sleeper = RecordingSleeper::new();
    let checker = checker(2, &sleeper);
    let probe = MockOperation::always_failing(network_error);
    let handle = MockHandle { id: 0 };

    let _ = checker.check(Some(&handle), &probe).await;

    assert_eq!(probe.calls(), 2);
    assert_eq!(sleeper.count(), 1);
}

#[tokio::test]
async fn test_fatal_probe_failure_is_degraded() {
    let sleeper = RecordingSleeper::new();
    let checker = checker(3, &sleeper);
    let probe = MockOperation::always_failing(fatal_error);
    let handle = MockHandle { id: 0 };

    let verdict = checker.check(Some(&handle), &probe).await;

    assert_eq!(verdict.status, HealthStatus::Degraded);
    assert_eq!(probe.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_probe_times_out_as_degraded() {
    let sleeper = RecordingSleeper::new();
    let checker = HealthChecker::new(
        ResilientExecutor::new(recording_policy(1, &sleeper)),
        Duration::from_millis(200),
    );
    let probe = MockOperation::returning(vec![1]).with_delay(Duration::from_secs(30));
    let handle = MockHandle { id: 0 };

    let verdict = checker.check(Some(&handle), &probe).await;

    assert_eq!(verdict.status, HealthStatus::Degraded);
    assert!(verdict.handle_present);
    assert!(verdict.detail.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_repeated_checks_give_same_verdict() {
    let sleeper = RecordingSleeper::new();
    let checker = checker(1, &sleeper);
    let handle = MockHandle { id: 0 };

    let healthy_probe = MockOperation::returning(vec![1]);
    let first = checker.check(Some(&handle), &healthy_probe).await;
    for _ in 0..5 {
        let next = checker.check(Some(&handle), &healthy_probe).await;
        assert!(next.same_outcome(&first));
    }

    let failing_probe = MockOperation::always_failing(network_error);
    let first = checker.check(Some(&handle), &failing_probe).await;
    for _ in 0..5 {
        let next = checker.check(Some(&handle), &failing_probe).await;
        assert!(next.same_outcome(&first));
    }

    let first = checker.check(None::<&MockHandle>, &healthy_probe).await;
    let second = checker.check(None::<&MockHandle>, &healthy_probe).await;
    assert!(second.same_outcome(&first));
}

#[tokio::test]
async fn test_verdict_serialization_shape() {
    let sleeper = RecordingSleeper::new();
    let checker = checker(1, &sleeper);
    let probe = MockOperation::returning(vec![1]);
    let handle = MockHandle { id: 0 };

    let healthy = serde_json::to_value(checker.check(Some(&handle), &probe).await).unwrap();
    assert_eq!(healthy["status"], "Healthy");
    assert_eq!(healthy["handle_present"], true);
    assert_eq!(healthy["probe_ok"], true);
    assert!(healthy.get("detail").is_none());
    assert!(healthy["checked_at"].is_string());

    let degraded = serde_json::to_value(checker.check(None::<&MockHandle>, &probe).await).unwrap();
    assert_eq!(degraded["status"], "Degraded");
    assert_eq!(degraded["detail"], "no client handle");
}

#[test]
fn test_status_http_mapping() {
    assert_eq!(HealthStatus::Healthy.http_status(), 200);
    assert_eq!(HealthStatus::Degraded.http_status(), 503);
}
