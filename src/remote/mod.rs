// src/remote/mod.rs

pub mod redis;

#[cfg(test)]
mod tests;

pub use self::redis::{Ping, RedisConnector, RedisHandle, SelectRows};

use super::error::{ConnectorError, Result};
use async_trait::async_trait;
use std::fmt;

/// Pre-resolved secret passed through to the remote service.
///
/// Debug and Display never print the secret itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for handing to the client library
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `***` followed by the last four characters; secrets under eight
    /// characters are hidden entirely
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() < 8 {
            return "***".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("***{}", tail)
    }

    /// Local format check; runs before any network call
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(ConnectorError::InvalidCredential(
                "credential is empty".to_string(),
            ));
        }
        if self.0.chars().any(char::is_whitespace) {
            return Err(ConnectorError::InvalidCredential(format!(
                "credential {} contains whitespace",
                self.masked()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Immutable `{address, credential}` pair describing the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    credential: Option<Credential>,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, credential: Option<Credential>) -> Self {
        Self {
            address: address.into(),
            credential,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

/// Capability that turns an endpoint into a usable client handle
#[async_trait]
pub trait Connector: Send + Sync {
    /// The handle produced by a successful connect
    type Handle: Send + Sync;

    /// A single connect attempt; no retries
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Handle>;

    /// Host and port the endpoint resolves to, when it has one
    fn socket_target(&self, endpoint: &Endpoint) -> Result<Option<(String, u16)>> {
        let _ = endpoint;
        Ok(None)
    }
}

/// A single read call issued against a connected handle
#[async_trait]
pub trait ReadOperation<H>: Send + Sync
where
    H: Send + Sync,
{
    /// Type of one returned record
    type Row: Send;

    /// Name used in logs
    fn name(&self) -> &str;

    /// Run the operation once; no retries
    async fn run(&self, handle: &H) -> Result<Vec<Self::Row>>;
}
