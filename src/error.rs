// for error definitions
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Failures reaching the remote endpoint at the transport level
    #[error("Network error: {0}")]
    Network(NetworkError),

    /// The remote service rejected the credential
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The endpoint address could not be parsed or is unsupported
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The credential is malformed; detected before any network call
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The remote service answered with an error
    #[error("Remote service error: {0}")]
    Remote(String),

    /// Data serialization/deserialization errors
    #[error("Data serialization error: {0}")]
    Serialization(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transport-level errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Host name could not be resolved
    #[error("name resolution failed: {0}")]
    Resolve(String),

    /// The endpoint actively refused the connection
    #[error("connection refused: {0}")]
    Refused(String),

    /// Connect or read did not finish in time
    #[error("timed out: {0}")]
    Timeout(String),

    /// Any other I/O failure on the way to the endpoint
    #[error("i/o failure: {0}")]
    Io(String),
}

impl ConnectorError {
    /// Shorthand for a transport timeout
    pub fn timeout(detail: impl Into<String>) -> Self {
        ConnectorError::Network(NetworkError::Timeout(detail.into()))
    }

    /// Short, stable name of the error variant, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorError::Network(NetworkError::Resolve(_)) => "resolve",
            ConnectorError::Network(NetworkError::Refused(_)) => "refused",
            ConnectorError::Network(NetworkError::Timeout(_)) => "timeout",
            ConnectorError::Network(NetworkError::Io(_)) => "io",
            ConnectorError::Auth(_) => "auth",
            ConnectorError::InvalidEndpoint(_) => "invalid_endpoint",
            ConnectorError::InvalidCredential(_) => "invalid_credential",
            ConnectorError::Remote(_) => "remote",
            ConnectorError::Serialization(_) => "serialization",
            ConnectorError::Config(_) => "config",
            ConnectorError::Internal(_) => "internal",
        }
    }
}

// Implement conversions from redis::RedisError to ConnectorError
impl From<redis::RedisError> for ConnectorError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            return ConnectorError::Network(NetworkError::Timeout(err.to_string()));
        }
        if err.is_connection_refusal() {
            return ConnectorError::Network(NetworkError::Refused(err.to_string()));
        }
        if matches!(err.code(), Some("NOAUTH") | Some("WRONGPASS")) {
            return ConnectorError::Auth(err.to_string());
        }

        match err.kind() {
            redis::ErrorKind::AuthenticationFailed => ConnectorError::Auth(err.to_string()),
            redis::ErrorKind::InvalidClientConfig => {
                ConnectorError::InvalidEndpoint(err.to_string())
            }
            redis::ErrorKind::IoError | redis::ErrorKind::ClientError => {
                // Connection-related errors
                ConnectorError::Network(NetworkError::Io(err.to_string()))
            }
            redis::ErrorKind::TypeError => ConnectorError::Serialization(err.to_string()),
            _ => {
                // Command/operation related errors
                ConnectorError::Remote(err.to_string())
            }
        }
    }
}

impl From<io::Error> for ConnectorError {
    fn from(err: io::Error) -> Self {
        let network = match err.kind() {
            io::ErrorKind::ConnectionRefused => NetworkError::Refused(err.to_string()),
            io::ErrorKind::TimedOut => NetworkError::Timeout(err.to_string()),
            _ => NetworkError::Io(err.to_string()),
        };
        ConnectorError::Network(network)
    }
}

// implement conversions from serde_json::Error to ConnectorError
impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Serialization(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ConnectorError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ConnectorError::timeout(err.to_string())
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, ConnectorError>;
