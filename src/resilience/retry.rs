use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::config::RetryConfig;
use crate::error::{ConnectorError, Result};
use crate::resilience::classifier::{classify, ErrorClass};
use crate::resilience::exponential_backoff::{jittered, ExponentialBackoff};
use crate::{retry_event, retry_stop};

/// Sleep primitive used between attempts
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// Suspends only the calling task
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        time::sleep(duration).await;
    }
}

/// Bookkeeping for a single attempt; never outlives the loop
#[derive(Debug)]
struct AttemptRecord {
    attempt_index: u32,
    started_at: Instant,
    error: Option<ErrorClass>,
}

impl AttemptRecord {
    fn start(attempt_index: u32) -> Self {
        Self {
            attempt_index,
            started_at: Instant::now(),
            error: None,
        }
    }
}

/// Why a retry loop gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A fatal error short-circuited the loop
    Fatal,
    /// Every attempt failed with a retryable error
    Exhausted,
    /// The next wait would overrun the configured deadline
    DeadlineExceeded,
}

/// Terminal failure of a retry loop
#[derive(Debug)]
pub struct RetryFailure {
    pub reason: StopReason,
    pub attempts: u32,
    pub last_error: Option<ConnectorError>,
}

impl RetryFailure {
    /// Class of the last error seen, if any attempt ran
    pub fn class(&self) -> Option<ErrorClass> {
        self.last_error.as_ref().map(classify)
    }
}

impl fmt::Display for RetryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            StopReason::Fatal => "fatal error",
            StopReason::Exhausted => "retries exhausted",
            StopReason::DeadlineExceeded => "deadline exceeded",
        };
        write!(f, "{} after {} attempt(s)", reason, self.attempts)?;
        if let Some(err) = &self.last_error {
            write!(f, ": {}", err)?;
        }
        Ok(())
    }
}

/// Successful value plus how many attempts it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// The one retry loop shared by the client factory and the executor
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    backoff: ExponentialBackoff,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        let backoff = ExponentialBackoff::new(config.base_delay);
        Self {
            config,
            backoff,
            sleeper,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        self.backoff
    }

    fn wait_for(&self, attempt_index: u32) -> Duration {
        let delay = self.backoff.delay(attempt_index);
        if self.config.use_jitter {
            jittered(delay)
        } else {
            delay
        }
    }

    /// Run `attempt` until it succeeds, fails fatally, runs out of attempts
    /// or would overrun the deadline.
    ///
    /// The first attempt starts immediately; attempt `n` that fails with a
    /// retryable error is followed by a sleep of `delay(n)` unless it was the
    /// last one.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        mut attempt: F,
    ) -> std::result::Result<Attempted<T>, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.config.max_retries;
        let started = Instant::now();
        let mut last_error = None;

        for attempt_index in 0..max_retries {
            let mut record = AttemptRecord::start(attempt_index);

            let result = match self.config.attempt_timeout {
                Some(limit) => match time::timeout(limit, attempt()).await {
                    Ok(result) => result,
                    Err(_) => Err(ConnectorError::timeout(format!(
                        "{} attempt {} exceeded {:?}",
                        operation, attempt_index, limit
                    ))),
                },
                None => attempt().await,
            };

            let err = match result {
                Ok(value) => {
                    debug!(
                        operation,
                        attempt_index,
                        elapsed_ms = record.started_at.elapsed().as_millis() as u64,
                        "Attempt succeeded"
                    );
                    return Ok(Attempted {
                        value,
                        attempts: attempt_index + 1,
                    });
                }
                Err(err) => err,
            };

            let class = classify(&err);
            record.error = Some(class);
            debug!(
                operation,
                attempt_index = record.attempt_index,
                elapsed_ms = record.started_at.elapsed().as_millis() as u64,
                error_class = ?record.error,
                error = %err,
                "Attempt failed"
            );

            if class == ErrorClass::Fatal {
                retry_stop!(
                    operation,
                    attempt_index,
                    max_retries,
                    class.as_str(),
                    err.kind(),
                    StopReason::Fatal
                );
                return Err(RetryFailure {
                    reason: StopReason::Fatal,
                    attempts: attempt_index + 1,
                    last_error: Some(err),
                });
            }

            if attempt_index + 1 == max_retries {
                retry_stop!(
                    operation,
                    attempt_index,
                    max_retries,
                    class.as_str(),
                    err.kind(),
                    StopReason::Exhausted
                );
                last_error = Some(err);
                break;
            }

            let wait = self.wait_for(attempt_index);
            if let Some(deadline) = self.config.deadline {
                if started.elapsed().saturating_add(wait) > deadline {
                    retry_stop!(
                        operation,
                        attempt_index,
                        max_retries,
                        class.as_str(),
                        err.kind(),
                        StopReason::DeadlineExceeded
                    );
                    return Err(RetryFailure {
                        reason: StopReason::DeadlineExceeded,
                        attempts: attempt_index + 1,
                        last_error: Some(err),
                    });
                }
            }

            retry_event!(
                operation,
                attempt_index,
                max_retries,
                class.as_str(),
                err.kind(),
                wait.as_millis() as u64
            );
            last_error = Some(err);
            self.sleeper.sleep(wait).await;
        }

        Err(RetryFailure {
            reason: StopReason::Exhausted,
            attempts: max_retries,
            last_error,
        })
    }
}
