// src/diagnostics.rs
//! Step-by-step connectivity diagnosis.
//!
//! Walks from configuration to a real query and stops at the first step
//! that fails, so an operator can see where the path to the service breaks.

use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::net::{lookup_host, TcpStream};
use tokio::time;
use tracing::{info, warn};

use crate::error::{ConnectorError, NetworkError, Result};
use crate::remote::{Connector, Endpoint, ReadOperation};
use crate::resilience::{FetchOutcome, ResilientExecutor};

const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one diagnostic step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
    pub elapsed_ms: u64,
}

/// All steps that ran, in order
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticReport {
    pub steps: Vec<StepResult>,
}

impl DiagnosticReport {
    pub fn passed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|step| step.ok)
    }

    /// First failing step, if any
    pub fn failure(&self) -> Option<&StepResult> {
        self.steps.iter().find(|step| !step.ok)
    }

    fn record(&mut self, name: &'static str, started: Instant, result: Result<String>) -> bool {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let (ok, detail) = match result {
            Ok(detail) => {
                info!(step = name, elapsed_ms, "{}", detail);
                (true, detail)
            }
            Err(err) => {
                warn!(step = name, elapsed_ms, error_kind = err.kind(), "{}", err);
                (false, err.to_string())
            }
        };
        self.steps.push(StepResult {
            name,
            ok,
            detail,
            elapsed_ms,
        });
        ok
    }
}

/// Resolve `host` and return the first address
async fn resolve(host: &str, port: u16) -> Result<std::net::SocketAddr> {
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|e| ConnectorError::Network(NetworkError::Resolve(format!("{}: {}", host, e))))?;
    addrs.next().ok_or_else(|| {
        ConnectorError::Network(NetworkError::Resolve(format!("{}: no addresses", host)))
    })
}

async fn tcp_connect(addr: std::net::SocketAddr) -> Result<()> {
    let stream = time::timeout(SOCKET_TIMEOUT, TcpStream::connect(addr)).await??;
    drop(stream);
    Ok(())
}

/// Diagnose the path to `endpoint`.
///
/// Steps: configuration, DNS, TCP, one client creation attempt, then `probe`
/// through `executor` with its retries.
pub async fn diagnose<C, P>(
    connector: &C,
    endpoint: &Endpoint,
    executor: &ResilientExecutor,
    probe: &P,
) -> DiagnosticReport
where
    C: Connector,
    P: ReadOperation<C::Handle>,
{
    let mut report = DiagnosticReport::default();

    let started = Instant::now();
    let target = connector.socket_target(endpoint);
    let target = match target {
        Ok(target) => {
            let credential = endpoint
                .credential()
                .map(|c| c.masked())
                .unwrap_or_else(|| "none".to_string());
            report.record(
                "configuration",
                started,
                Ok(format!(
                    "address {}, credential {}",
                    endpoint.address(),
                    credential
                )),
            );
            target
        }
        Err(err) => {
            report.record("configuration", started, Err(err));
            return report;
        }
    };

    if let Some((host, port)) = target {
        let started = Instant::now();
        let addr = match resolve(&host, port).await {
            Ok(addr) => {
                report.record("dns", started, Ok(format!("{} -> {}", host, addr.ip())));
                addr
            }
            Err(err) => {
                report.record("dns", started, Err(err));
                return report;
            }
        };

        let started = Instant::now();
        let connected = tcp_connect(addr)
            .await
            .map(|_| format!("socket connected to {}", addr));
        if !report.record("tcp", started, connected) {
            return report;
        }
    }

    let started = Instant::now();
    let handle = match connector.connect(endpoint).await {
        Ok(handle) => {
            report.record("client", started, Ok("client created".to_string()));
            handle
        }
        Err(err) => {
            report.record("client", started, Err(err));
            return report;
        }
    };

    let started = Instant::now();
    let query = match executor.execute_outcome(Some(&handle), probe).await {
        FetchOutcome::Rows { rows, attempts } => Ok(format!(
            "query returned {} row(s) after {} attempt(s)",
            rows.len(),
            attempts
        )),
        FetchOutcome::Failed(failure) => match failure.last_error {
            Some(err) => Err(err),
            None => Err(ConnectorError::Internal("query never ran".to_string())),
        },
        FetchOutcome::NoHandle => Err(ConnectorError::Internal("no client handle".to_string())),
    };
    report.record("query", started, query);

    report
}
