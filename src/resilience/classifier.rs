use serde::Serialize;

use crate::error::ConnectorError;

/// Retry class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// DNS, connection refusal, transport timeout or other I/O reaching the endpoint
    RetryableNetwork,
    /// Anything else that is not provably permanent
    RetryableOther,
    /// Permanent; retrying cannot change the outcome
    Fatal,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorClass::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::RetryableNetwork => "retryable_network",
            ErrorClass::RetryableOther => "retryable_other",
            ErrorClass::Fatal => "fatal",
        }
    }
}

/// Map an error to its retry class.
///
/// Bad credentials, unparsable endpoints, configuration mistakes and
/// undecodable data are fatal. Transport failures are network-retryable.
/// Service-side and internal errors are retried as "other".
pub fn classify(error: &ConnectorError) -> ErrorClass {
    match error {
        ConnectorError::Network(_) => ErrorClass::RetryableNetwork,
        ConnectorError::Remote(_) | ConnectorError::Internal(_) => ErrorClass::RetryableOther,
        ConnectorError::Auth(_)
        | ConnectorError::InvalidEndpoint(_)
        | ConnectorError::InvalidCredential(_)
        | ConnectorError::Serialization(_)
        | ConnectorError::Config(_) => ErrorClass::Fatal,
    }
}

impl ConnectorError {
    pub fn class(&self) -> ErrorClass {
        classify(self)
    }
}
