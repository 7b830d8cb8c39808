// src/test_utils.rs

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{ConnectorError, NetworkError, Result};
use crate::remote::{Connector, Credential, Endpoint, ReadOperation};
use crate::resilience::{RetryPolicy, Sleeper};

/// Builds the error a mock should fail with
pub type ErrorFactory = fn() -> ConnectorError;

pub fn network_error() -> ConnectorError {
    ConnectorError::Network(NetworkError::Refused("mock connection refused".to_string()))
}

pub fn remote_error() -> ConnectorError {
    ConnectorError::Remote("mock service busy".to_string())
}

pub fn fatal_error() -> ConnectorError {
    ConnectorError::Auth("mock credential rejected".to_string())
}

pub fn test_endpoint() -> Endpoint {
    Endpoint::new("mock://service", Some(Credential::new("secret-key-1234")))
}

/// Retry settings with a small base delay
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        base_delay: Duration::from_millis(10),
        ..RetryConfig::default()
    }
}

pub fn recording_policy(max_retries: u32, sleeper: &Arc<RecordingSleeper>) -> RetryPolicy {
    RetryPolicy::with_sleeper(
        fast_retry(max_retries),
        Arc::clone(sleeper) as Arc<dyn Sleeper>,
    )
}

/// Sleeper that records requested waits and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Handle produced by [`MockConnector`]; `id` is the attempt that created it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHandle {
    pub id: usize,
}

/// Connector that fails a fixed number of times, then succeeds
#[derive(Debug)]
pub struct MockConnector {
    failures: usize,
    error: ErrorFactory,
    delay: Option<Duration>,
    attempts: AtomicUsize,
}

impl MockConnector {
    pub fn succeeding() -> Self {
        Self::failing_times(0, network_error)
    }

    pub fn failing_times(failures: usize, error: ErrorFactory) -> Self {
        Self {
            failures,
            error,
            delay: None,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn always_failing(error: ErrorFactory) -> Self {
        Self::failing_times(usize::MAX, error)
    }

    /// Every attempt takes `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Handle = MockHandle;

    async fn connect(&self, _endpoint: &Endpoint) -> Result<MockHandle> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if attempt < self.failures {
            return Err((self.error)());
        }
        Ok(MockHandle { id: attempt })
    }
}

/// Read operation that fails a fixed number of times, then returns `rows`
#[derive(Debug)]
pub struct MockOperation {
    rows: Vec<u32>,
    failures: usize,
    error: ErrorFactory,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockOperation {
    pub fn returning(rows: Vec<u32>) -> Self {
        Self::failing_times(0, network_error, rows)
    }

    pub fn failing_times(failures: usize, error: ErrorFactory, rows: Vec<u32>) -> Self {
        Self {
            rows,
            failures,
            error,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_failing(error: ErrorFactory) -> Self {
        Self::failing_times(usize::MAX, error, Vec::new())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadOperation<MockHandle> for MockOperation {
    type Row = u32;

    fn name(&self) -> &str {
        "mock_read"
    }

    async fn run(&self, _handle: &MockHandle) -> Result<Vec<u32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.failures {
            return Err((self.error)());
        }
        Ok(self.rows.clone())
    }
}
