//! Service discovery
//!
//! Maps a service name and tag to the network addresses advertising it.

mod consul;

pub use consul::{ConsulDiscovery, DEFAULT_CONSUL_ADDRESS};

use crate::error::CredentialError;
use async_trait::async_trait;
use std::fmt;

/// One advertised instance of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddress {
    pub address: String,
    pub port: u16,
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Resolves service names to addresses
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// Addresses for `service` carrying `tag`, in the order the registry returns them.
    ///
    /// An unreachable registry is a `Discovery` error; an empty list is not an error here.
    async fn resolve(&self, service: &str, tag: &str) -> Result<Vec<ServiceAddress>, CredentialError>;
}
