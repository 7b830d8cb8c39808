// library entry
pub mod config;
pub mod connector;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod remote;
pub mod resilience;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

// Re-export key components for convenience
pub use config::{ConnectorConfig, HealthCheckConfig, RetryConfig};
pub use connector::RemoteConnector;
pub use error::{ConnectorError, Result};
pub use logging::init as init_logging;
pub use remote::{Connector, Credential, Endpoint, ReadOperation};
pub use resilience::{FetchOutcome, HandleState, HealthStatus, HealthVerdict};
