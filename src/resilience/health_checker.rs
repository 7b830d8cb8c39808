use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time;

use crate::health_verdict;
use crate::remote::ReadOperation;
use crate::resilience::executor::{FetchOutcome, ResilientExecutor};

/// Overall health of the remote dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl HealthStatus {
    /// Status code a health endpoint should answer with
    pub fn http_status(self) -> u16 {
        match self {
            HealthStatus::Healthy => 200,
            HealthStatus::Degraded => 503,
        }
    }
}

/// Point-in-time health judgment; built fresh on every check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthVerdict {
    pub status: HealthStatus,
    pub handle_present: bool,
    pub probe_ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthVerdict {
    fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            handle_present: true,
            probe_ok: true,
            detail: None,
            checked_at: Utc::now(),
        }
    }

    fn degraded(handle_present: bool, detail: String) -> Self {
        Self {
            status: HealthStatus::Degraded,
            handle_present,
            probe_ok: false,
            detail: Some(detail),
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn http_status(&self) -> u16 {
        self.status.http_status()
    }

    /// Equal in every field except the timestamp
    pub fn same_outcome(&self, other: &HealthVerdict) -> bool {
        self.status == other.status
            && self.handle_present == other.handle_present
            && self.probe_ok == other.probe_ok
            && self.detail == other.detail
    }
}

/// Combines handle presence and a probe into a health verdict.
///
/// Holds no state between checks; retries only as far as its executor does.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    executor: ResilientExecutor,
    check_timeout: Duration,
}

impl HealthChecker {
    pub fn new(executor: ResilientExecutor, check_timeout: Duration) -> Self {
        Self {
            executor,
            check_timeout,
        }
    }

    pub async fn check<H, P>(&self, handle: Option<&H>, probe: &P) -> HealthVerdict
    where
        H: Send + Sync,
        P: ReadOperation<H>,
    {
        let verdict = match handle {
            None => HealthVerdict::degraded(false, "no client handle".to_string()),
            Some(handle) => {
                let probe_call = self.executor.execute_outcome(Some(handle), probe);
                match time::timeout(self.check_timeout, probe_call).await {
                    Ok(FetchOutcome::Rows { .. }) => HealthVerdict::healthy(),
                    Ok(FetchOutcome::Failed(failure)) => {
                        HealthVerdict::degraded(true, format!("probe failed: {}", failure))
                    }
                    // unreachable with Some(handle), kept total
                    Ok(FetchOutcome::NoHandle) => {
                        HealthVerdict::degraded(false, "no client handle".to_string())
                    }
                    Err(_) => HealthVerdict::degraded(
                        true,
                        format!("probe timed out after {:?}", self.check_timeout),
                    ),
                }
            }
        };

        health_verdict!(verdict);
        verdict
    }
}
