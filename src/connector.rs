// src/connector.rs

use std::sync::Arc;
use tracing::info;

use crate::config::ConnectorConfig;
use crate::remote::{Connector, Endpoint, ReadOperation};
use crate::resilience::{
    ClientFactory, FetchOutcome, HandleState, HealthChecker, HealthVerdict, ResilientExecutor,
    RetryPolicy, SharedClient, Sleeper, TokioSleeper,
};

/// Resilient connector to a remote data service
///
/// Owns the endpoint, the write-once client handle and the three resilience
/// components built around it:
///
/// ```plaintext
///  initialize() ──► ClientFactory ──► SharedClient (write-once)
///                                          │
///  fetch() ─────► ResilientExecutor ◄──────┤
///                                          │
///  health() ────► HealthChecker ◄──────────┘
/// ```
#[derive(Debug)]
pub struct RemoteConnector<C: Connector> {
    factory: ClientFactory<C>,
    client: SharedClient<C::Handle>,
    executor: ResilientExecutor,
    health: HealthChecker,
}

impl<C: Connector> RemoteConnector<C> {
    /// Create a connector; nothing touches the network until [`initialize`](Self::initialize)
    pub fn new(connector: C, endpoint: Endpoint, config: &ConnectorConfig) -> Self {
        Self::with_sleeper(connector, endpoint, config, Arc::new(TokioSleeper))
    }

    /// Same as [`new`](Self::new) with a custom sleep primitive
    pub fn with_sleeper(
        connector: C,
        endpoint: Endpoint,
        config: &ConnectorConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let factory = ClientFactory::new(
            connector,
            endpoint,
            RetryPolicy::with_sleeper(config.connect.clone(), Arc::clone(&sleeper)),
        );
        let executor = ResilientExecutor::new(RetryPolicy::with_sleeper(
            config.query.clone(),
            Arc::clone(&sleeper),
        ));
        let probe_executor = ResilientExecutor::new(RetryPolicy::with_sleeper(
            config.health.probe_retry(&config.query),
            sleeper,
        ));

        Self {
            factory,
            client: SharedClient::new(),
            executor,
            health: HealthChecker::new(probe_executor, config.health.check_timeout),
        }
    }

    /// Run the client factory once. Later calls return the stored outcome.
    pub async fn initialize(&self) -> HandleState {
        self.client.get_or_initialize(&self.factory).await;
        let state = self.client.state();
        info!(address = self.factory.endpoint().address(), state = ?state, "Connector initialized");
        state
    }

    pub fn state(&self) -> HandleState {
        self.client.state()
    }

    pub fn handle(&self) -> Option<Arc<C::Handle>> {
        self.client.handle()
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.factory.endpoint()
    }

    pub fn connector(&self) -> &C {
        self.factory.connector()
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    /// Rows from `operation`; empty when the handle is absent or all attempts failed
    pub async fn fetch<O>(&self, operation: &O) -> Vec<O::Row>
    where
        O: ReadOperation<C::Handle>,
    {
        let handle = self.client.handle();
        self.executor.execute(handle.as_deref(), operation).await
    }

    /// Like [`fetch`](Self::fetch) but distinguishes failure from "no data"
    pub async fn fetch_outcome<O>(&self, operation: &O) -> FetchOutcome<O::Row>
    where
        O: ReadOperation<C::Handle>,
    {
        let handle = self.client.handle();
        self.executor
            .execute_outcome(handle.as_deref(), operation)
            .await
    }

    /// Fresh health verdict using `probe`
    pub async fn health<P>(&self, probe: &P) -> HealthVerdict
    where
        P: ReadOperation<C::Handle>,
    {
        let handle = self.client.handle();
        self.health.check(handle.as_deref(), probe).await
    }
}
