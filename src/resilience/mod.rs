// src/resilience/mod.rs
//! Resilience core for talking to a remote data service.
//!
//! 1. **Backoff** - `delay(n) = base * 2^n` between attempts
//! 2. **Classification** - every error is network-retryable, otherwise-retryable or fatal
//! 3. **Client factory** - builds the client handle once, retrying transient failures
//! 4. **Executor** - runs read operations with the same retry discipline, degrading to no data
//! 5. **Health checks** - handle presence plus a cheap probe, folded into a verdict

mod classifier;
mod client_factory;
mod executor;
mod exponential_backoff;
mod health_checker;
mod retry;

#[cfg(test)]
mod tests;

// Re-export key components
pub use crate::config::{HealthCheckConfig, RetryConfig};
pub use classifier::{classify, ErrorClass};
pub use client_factory::{ClientFactory, HandleState, SharedClient};
pub use executor::{FetchOutcome, ResilientExecutor};
pub use exponential_backoff::{jittered, ExponentialBackoff};
pub use health_checker::{HealthChecker, HealthStatus, HealthVerdict};
pub use retry::{Attempted, RetryFailure, RetryPolicy, Sleeper, StopReason, TokioSleeper};
