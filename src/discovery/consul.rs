//! Consul health-API discovery client

use super::{ServiceAddress, ServiceDiscovery};
use crate::error::CredentialError;
use async_trait::async_trait;
use serde::Deserialize;

/// Default Consul agent address
pub const DEFAULT_CONSUL_ADDRESS: &str = "http://localhost:8500";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: NodeInfo,
    service: ServiceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeInfo {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceInfo {
    #[serde(default)]
    address: String,
    port: u16,
}

impl From<HealthEntry> for ServiceAddress {
    fn from(entry: HealthEntry) -> Self {
        // Consul leaves the service address empty when it matches the node's
        let address = if entry.service.address.is_empty() {
            entry.node.address
        } else {
            entry.service.address
        };

        ServiceAddress {
            address,
            port: entry.service.port,
        }
    }
}

/// Queries `/v1/health/service/{name}` for passing instances carrying a tag
#[derive(Debug, Clone)]
pub struct ConsulDiscovery {
    http: reqwest::Client,
    base_url: String,
}

impl ConsulDiscovery {
    /// `address` may omit the scheme (`localhost:8500`), in which case http is used
    pub fn new(http: reqwest::Client, address: &str) -> Self {
        let address = address.trim_end_matches('/');
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ServiceDiscovery for ConsulDiscovery {
    async fn resolve(&self, service: &str, tag: &str) -> Result<Vec<ServiceAddress>, CredentialError> {
        let url = format!("{}/v1/health/service/{}", self.base_url, service);

        tracing::debug!(url = %url, service, tag, "Querying Consul for service");

        let response = self
            .http
            .get(&url)
            .query(&[("tag", tag), ("passing", "true")])
            .send()
            .await
            .map_err(|e| CredentialError::Discovery(format!("Couldn't reach Consul: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialError::Discovery(format!(
                "Consul returned status {} for service '{}'",
                status.as_u16(),
                service
            )));
        }

        let entries: Vec<HealthEntry> = response.json().await.map_err(|e| {
            CredentialError::Discovery(format!("Invalid Consul response: {}", e))
        })?;

        let addresses: Vec<ServiceAddress> = entries.into_iter().map(ServiceAddress::from).collect();

        tracing::debug!(service, tag, count = addresses.len(), "Consul lookup complete");

        Ok(addresses)
    }
}
