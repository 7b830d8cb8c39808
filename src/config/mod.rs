// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConnectorError, Result};
use crate::remote::{Credential, Endpoint};

/// Top-level configuration for the connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Key prefix to use for all keys on the remote service
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Timeout for a single connect attempt
    #[serde(default = "default_conn_timeout", with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Retry policy used while establishing the client handle
    #[serde(default = "default_connect_retry")]
    pub connect: RetryConfig,

    /// Retry policy used for read operations
    #[serde(default = "default_query_retry")]
    pub query: RetryConfig,

    /// Health check settings
    #[serde(default)]
    pub health: HealthCheckConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            connection_timeout: default_conn_timeout(),
            connect: default_connect_retry(),
            query: default_query_retry(),
            health: HealthCheckConfig::default(),
        }
    }
}

fn default_key_prefix() -> String {
    "connector".to_string()
}

fn default_conn_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_connect_retry() -> RetryConfig {
    RetryConfig::default()
}

fn default_query_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        ..RetryConfig::default()
    }
}

/// Configuration for a retry loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base unit of the exponential backoff
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,

    /// Whether to sleep a random 50-100% of the computed delay
    #[serde(default)]
    pub use_jitter: bool,

    /// Upper bound for one attempt
    #[serde(default, with = "option_duration_serde")]
    pub attempt_timeout: Option<Duration>,

    /// Wall-clock budget for the whole loop
    #[serde(default, with = "option_duration_serde")]
    pub deadline: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            use_jitter: false,
            attempt_timeout: None,
            deadline: None,
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

impl RetryConfig {
    fn validate(&self, name: &str) -> Result<()> {
        if self.max_retries == 0 {
            return Err(ConnectorError::Config(format!(
                "{}.max_retries must be at least 1",
                name
            )));
        }
        if self.base_delay.is_zero() {
            return Err(ConnectorError::Config(format!(
                "{}.base_delay must be greater than zero",
                name
            )));
        }
        Ok(())
    }
}

/// Configuration for health checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Attempts the probe gets per check
    #[serde(default = "default_probe_retries")]
    pub probe_retries: u32,

    /// Table the probe reads from
    #[serde(default = "default_probe_table")]
    pub probe_table: String,

    /// Maximum number of rows the probe may read
    #[serde(default = "default_probe_limit")]
    pub probe_limit: usize,

    /// Timeout for the whole health check
    #[serde(default = "default_check_timeout", with = "duration_serde")]
    pub check_timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            probe_retries: default_probe_retries(),
            probe_table: default_probe_table(),
            probe_limit: default_probe_limit(),
            check_timeout: default_check_timeout(),
        }
    }
}

fn default_probe_retries() -> u32 {
    1
}

fn default_probe_table() -> String {
    "messages".to_string()
}

fn default_probe_limit() -> usize {
    1
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(5)
}

impl HealthCheckConfig {
    /// Retry policy for the probe: same backoff unit as `query`, fewer attempts
    pub fn probe_retry(&self, query: &RetryConfig) -> RetryConfig {
        RetryConfig {
            max_retries: self.probe_retries,
            deadline: None,
            ..query.clone()
        }
    }
}

impl ConnectorConfig {
    /// Parse a configuration from JSON, filling in defaults for missing fields
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from defaults plus `CONNECTOR_*` environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(prefix) = env::var("CONNECTOR_KEY_PREFIX") {
            config.key_prefix = prefix;
        }
        if let Ok(table) = env::var("CONNECTOR_PROBE_TABLE") {
            config.health.probe_table = table;
        }
        if let Some(n) = env_parse::<u32>("CONNECTOR_MAX_RETRIES")? {
            config.connect.max_retries = n;
        }
        if let Some(n) = env_parse::<u32>("CONNECTOR_QUERY_RETRIES")? {
            config.query.max_retries = n;
        }
        if let Some(ms) = env_parse::<u64>("CONNECTOR_BASE_DELAY_MS")? {
            config.connect.base_delay = Duration::from_millis(ms);
            config.query.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("CONNECTOR_ATTEMPT_TIMEOUT_MS")? {
            config.connect.attempt_timeout = Some(Duration::from_millis(ms));
            config.query.attempt_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = env_parse::<u64>("CONNECTOR_DEADLINE_MS")? {
            config.connect.deadline = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = env_parse::<u64>("CONNECTOR_CONNECTION_TIMEOUT_MS")? {
            config.connection_timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the retry loops or the probe meaningless
    pub fn validate(&self) -> Result<()> {
        self.connect.validate("connect")?;
        self.query.validate("query")?;
        if self.health.probe_retries == 0 {
            return Err(ConnectorError::Config(
                "health.probe_retries must be at least 1".to_string(),
            ));
        }
        if self.health.probe_limit == 0 {
            return Err(ConnectorError::Config(
                "health.probe_limit must be at least 1".to_string(),
            ));
        }
        if self.key_prefix.is_empty() {
            return Err(ConnectorError::Config(
                "key_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read the endpoint descriptor from `CONNECTOR_URL` and `CONNECTOR_KEY`
pub fn endpoint_from_env() -> Result<Endpoint> {
    let url = env::var("CONNECTOR_URL")
        .map_err(|_| ConnectorError::Config("CONNECTOR_URL is not set".to_string()))?;
    let credential = env::var("CONNECTOR_KEY").ok().map(Credential::new);
    Ok(Endpoint::new(url, credential))
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConnectorError::Config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

// Helper module to serialize/deserialize Duration with serde
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
