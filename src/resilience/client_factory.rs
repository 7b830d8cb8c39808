use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::remote::{Connector, Endpoint};
use crate::resilience::retry::RetryPolicy;

/// Lifecycle of the client handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// The factory has not run yet
    Uninitialized,
    /// A usable handle is held
    Connected,
    /// The factory ran and gave up
    Absent,
}

/// Builds the client handle, retrying transient connect failures
#[derive(Debug)]
pub struct ClientFactory<C> {
    connector: C,
    endpoint: Endpoint,
    retry: RetryPolicy,
}

impl<C: Connector> ClientFactory<C> {
    pub fn new(connector: C, endpoint: Endpoint, retry: RetryPolicy) -> Self {
        Self {
            connector,
            endpoint,
            retry,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Connect with retries; `None` when every attempt failed or one was fatal.
    ///
    /// Never returns an error: exhaustion is a normal outcome.
    pub async fn initialize(&self) -> Option<Arc<C::Handle>> {
        let result = self
            .retry
            .run("connect", || self.connector.connect(&self.endpoint))
            .await;

        match result {
            Ok(connected) => {
                info!(
                    address = self.endpoint.address(),
                    attempts = connected.attempts,
                    "Client handle created"
                );
                Some(Arc::new(connected.value))
            }
            Err(failure) => {
                error!(
                    address = self.endpoint.address(),
                    reason = ?failure.reason,
                    attempts = failure.attempts,
                    "Failed to create client handle: {}",
                    failure
                );
                None
            }
        }
    }
}

/// Write-once slot holding the handle produced by the factory.
///
/// Readers share the handle without locking. The slot cannot be replaced
/// once set; a reconnect path would need a swappable reference instead.
#[derive(Debug)]
pub struct SharedClient<H> {
    cell: OnceCell<Option<Arc<H>>>,
}

impl<H> Default for SharedClient<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> SharedClient<H> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Slot already holding the outcome of an initialization done elsewhere
    pub fn from_outcome(handle: Option<Arc<H>>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(handle)),
        }
    }

    pub fn state(&self) -> HandleState {
        match self.cell.get() {
            None => HandleState::Uninitialized,
            Some(None) => HandleState::Absent,
            Some(Some(_)) => HandleState::Connected,
        }
    }

    /// Current handle; `None` when absent or not yet initialized
    pub fn handle(&self) -> Option<Arc<H>> {
        self.cell.get().and_then(|slot| slot.clone())
    }

    /// Run the factory the first time only; later callers get the stored outcome
    pub async fn get_or_initialize<C>(&self, factory: &ClientFactory<C>) -> Option<Arc<H>>
    where
        C: Connector<Handle = H>,
    {
        let slot = self.cell.get_or_init(|| factory.initialize()).await;
        slot.clone()
    }
}
