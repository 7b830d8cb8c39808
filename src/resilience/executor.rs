use tracing::{debug, warn};

use crate::remote::ReadOperation;
use crate::resilience::retry::{RetryFailure, RetryPolicy};

/// What a resilient read produced
#[derive(Debug)]
pub enum FetchOutcome<R> {
    /// The operation succeeded; rows may be empty
    Rows { rows: Vec<R>, attempts: u32 },
    /// No handle was available, nothing was attempted
    NoHandle,
    /// Every attempt failed, or one failed fatally
    Failed(RetryFailure),
}

impl<R> FetchOutcome<R> {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Rows { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            FetchOutcome::Rows { attempts, .. } => *attempts,
            FetchOutcome::NoHandle => 0,
            FetchOutcome::Failed(failure) => failure.attempts,
        }
    }

    /// Collapse to rows, treating any failure as "no data"
    pub fn into_rows(self) -> Vec<R> {
        match self {
            FetchOutcome::Rows { rows, .. } => rows,
            FetchOutcome::NoHandle | FetchOutcome::Failed(_) => Vec::new(),
        }
    }
}

/// Runs read operations against the current handle with retries
#[derive(Debug, Clone)]
pub struct ResilientExecutor {
    retry: RetryPolicy,
}

impl ResilientExecutor {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Rows from `operation`, or an empty vector on any failure. Never errors.
    pub async fn execute<H, O>(&self, handle: Option<&H>, operation: &O) -> Vec<O::Row>
    where
        H: Send + Sync,
        O: ReadOperation<H>,
    {
        self.execute_outcome(handle, operation).await.into_rows()
    }

    /// Like [`execute`](Self::execute) but keeps "failed" apart from "no data"
    pub async fn execute_outcome<H, O>(
        &self,
        handle: Option<&H>,
        operation: &O,
    ) -> FetchOutcome<O::Row>
    where
        H: Send + Sync,
        O: ReadOperation<H>,
    {
        let name = operation.name();
        let handle = match handle {
            Some(handle) => handle,
            None => {
                debug!(
                    operation = name,
                    "No client handle, returning empty result"
                );
                return FetchOutcome::NoHandle;
            }
        };

        match self.retry.run(name, || operation.run(handle)).await {
            Ok(done) => {
                debug!(
                    operation = name,
                    rows = done.value.len(),
                    attempts = done.attempts,
                    "Operation completed"
                );
                FetchOutcome::Rows {
                    rows: done.value,
                    attempts: done.attempts,
                }
            }
            Err(failure) => {
                warn!(
                    operation = name,
                    reason = ?failure.reason,
                    attempts = failure.attempts,
                    "Operation failed, returning empty result: {}",
                    failure
                );
                FetchOutcome::Failed(failure)
            }
        }
    }
}
