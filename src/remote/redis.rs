// src/remote/redis.rs

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::error::{ConnectorError, Result};
use crate::remote::{Connector, Endpoint, ReadOperation};

/// Key under which a table's rows are stored
pub fn table_key(key_prefix: &str, table: &str) -> String {
    format!("{}:table:{}", key_prefix, table)
}

/// Build connection info from an endpoint, validating the credential first
pub(crate) fn connection_info(endpoint: &Endpoint) -> Result<ConnectionInfo> {
    if let Some(credential) = endpoint.credential() {
        credential.validate()?;
    }

    let mut info = endpoint
        .address()
        .into_connection_info()
        .map_err(|e| ConnectorError::InvalidEndpoint(format!("{}: {}", endpoint.address(), e)))?;

    if let Some(credential) = endpoint.credential() {
        info.redis.password = Some(credential.expose().to_string());
    }

    Ok(info)
}

/// Connects to Redis; one attempt per call
#[derive(Debug, Clone)]
pub struct RedisConnector {
    connection_timeout: Duration,
}

impl RedisConnector {
    pub fn new(connection_timeout: Duration) -> Self {
        Self { connection_timeout }
    }
}

#[async_trait]
impl Connector for RedisConnector {
    type Handle = RedisHandle;

    async fn connect(&self, endpoint: &Endpoint) -> Result<RedisHandle> {
        let info = connection_info(endpoint)?;
        let client = Client::open(info)?;

        // Retries belong to the client factory, not to the connection manager
        let manager_config = ConnectionManagerConfig::new().set_number_of_retries(0);
        let connection_future = ConnectionManager::new_with_config(client, manager_config);

        let connecting = tokio::time::timeout(self.connection_timeout, connection_future);
        let manager = match connecting.await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ConnectorError::timeout(format!(
                    "connection to {} timed out after {:?}",
                    endpoint.address(),
                    self.connection_timeout
                )));
            }
        };

        debug!(address = endpoint.address(), "Redis connection established");

        Ok(RedisHandle {
            manager,
            address: endpoint.address().to_string(),
        })
    }

    fn socket_target(&self, endpoint: &Endpoint) -> Result<Option<(String, u16)>> {
        let info = connection_info(endpoint)?;
        let target = match info.addr {
            ConnectionAddr::Tcp(host, port) => Some((host, port)),
            ConnectionAddr::TcpTls { host, port, .. } => Some((host, port)),
            _ => None,
        };
        Ok(target)
    }
}

/// Connected Redis client; cheap to clone
#[derive(Clone)]
pub struct RedisHandle {
    manager: ConnectionManager,
    address: String,
}

impl fmt::Debug for RedisHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisHandle")
            .field("address", &self.address)
            .finish()
    }
}

impl RedisHandle {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Append one JSON row to a table, returning the new row count
    pub async fn insert_row(&self, key_prefix: &str, table: &str, row: &Value) -> Result<usize> {
        let payload = serde_json::to_string(row)?;
        let mut conn = self.manager.clone();
        let len: usize = conn.rpush(table_key(key_prefix, table), payload).await?;
        Ok(len)
    }
}

/// Read up to `limit` rows from a table, oldest first
#[derive(Debug, Clone)]
pub struct SelectRows {
    key: String,
    limit: Option<usize>,
}

impl SelectRows {
    pub fn new(key_prefix: &str, table: &str) -> Self {
        Self {
            key: table_key(key_prefix, table),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Inclusive stop index for LRANGE, or None when nothing should be read
    pub(crate) fn stop_index(&self) -> Option<isize> {
        match self.limit {
            Some(0) => None,
            Some(n) => Some(isize::try_from(n).map(|n| n - 1).unwrap_or(-1)),
            None => Some(-1),
        }
    }
}

#[async_trait]
impl ReadOperation<RedisHandle> for SelectRows {
    type Row = Value;

    fn name(&self) -> &str {
        "select_rows"
    }

    async fn run(&self, handle: &RedisHandle) -> Result<Vec<Value>> {
        let stop = match self.stop_index() {
            Some(stop) => stop,
            None => return Ok(Vec::new()),
        };

        let mut conn = handle.manager.clone();
        let raw: Vec<String> = conn.lrange(&self.key, 0, stop).await?;

        raw.iter()
            .map(|item| serde_json::from_str(item).map_err(ConnectorError::from))
            .collect()
    }
}

/// PING as a probe; yields the single reply string
#[derive(Debug, Clone, Copy, Default)]
pub struct Ping;

#[async_trait]
impl ReadOperation<RedisHandle> for Ping {
    type Row = String;

    fn name(&self) -> &str {
        "ping"
    }

    async fn run(&self, handle: &RedisHandle) -> Result<Vec<String>> {
        let mut conn = handle.manager.clone();
        let reply: String = AsyncCommands::ping(&mut conn).await?;

        if reply == "PONG" {
            Ok(vec![reply])
        } else {
            Err(ConnectorError::Remote(format!(
                "Unexpected response from Redis PING: {}",
                reply
            )))
        }
    }
}
