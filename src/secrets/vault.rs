//! Vault HTTP client for keyed secret reads

use super::{SecretRecord, SecretStore, TokenSearch};
use crate::config::VaultConfig;
use crate::discovery::{ServiceAddress, ServiceDiscovery};
use crate::error::CredentialError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use zeroize::Zeroizing;

/// Header carrying the Vault token
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

#[derive(Debug, Deserialize)]
struct SecretResponse {
    #[serde(default)]
    data: Option<SecretRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Authenticated Vault client bound to a single address.
///
/// The address is resolved once, at construction, and never re-resolved.
#[derive(Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    address: String,
    token: Zeroizing<String>,
}

impl fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultClient")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl VaultClient {
    /// Client for a known address and token
    pub fn new(
        http: reqwest::Client,
        address: impl Into<String>,
        token: Zeroizing<String>,
    ) -> Result<Self, CredentialError> {
        if token.trim().is_empty() {
            return Err(CredentialError::NoTokenFound);
        }

        let address = address.into().trim_end_matches('/').to_string();
        if address.is_empty() {
            return Err(CredentialError::Configuration(
                "secret store address cannot be empty".to_string(),
            ));
        }
        reqwest::Url::parse(&address).map_err(|e| {
            CredentialError::Configuration(format!("Invalid secret store address '{}': {}", address, e))
        })?;

        Ok(Self {
            http,
            address,
            token,
        })
    }

    /// Locate the active Vault through discovery and authenticate with a local token.
    ///
    /// 1. Resolve `config.service_name` tagged `config.service_tag`
    /// 2. Fail with `NoServiceAvailable` when nothing is advertised
    /// 3. Read the token from the home directory or the search path
    /// 4. Use `config.address_override` if set, else `https://{address}:{port}` of the first entry
    pub async fn discover(
        discovery: &dyn ServiceDiscovery,
        config: &VaultConfig,
        http: reqwest::Client,
    ) -> Result<Self, CredentialError> {
        let addresses = discovery
            .resolve(&config.service_name, &config.service_tag)
            .await?;

        let first = addresses
            .first()
            .ok_or_else(|| CredentialError::NoServiceAvailable {
                service: config.service_name.clone(),
                tag: config.service_tag.clone(),
            })?;

        let token = TokenSearch::from_config(config).resolve()?;
        let address = vault_address(config.address_override.as_deref(), first);

        tracing::info!(
            address = %address,
            discovered = %first,
            candidates = addresses.len(),
            "Using secret store"
        );

        Self::new(http, address, token)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// `{address}/v1/{key}`, with each key segment percent-encoded
    fn secret_url(&self, key: &str) -> Result<reqwest::Url, CredentialError> {
        let mut url = reqwest::Url::parse(&self.address).map_err(|e| {
            CredentialError::Configuration(format!("Invalid secret store address '{}': {}", self.address, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                CredentialError::Configuration(format!(
                    "Secret store address '{}' cannot carry a path",
                    self.address
                ))
            })?
            .pop_if_empty()
            .push("v1")
            .extend(key.split('/').filter(|segment| !segment.is_empty()));

        Ok(url)
    }
}

/// The override wins when set and non-empty; otherwise https on the discovered address
fn vault_address(address_override: Option<&str>, discovered: &ServiceAddress) -> String {
    match address_override.map(str::trim).filter(|a| !a.is_empty()) {
        Some(address) => address.to_string(),
        None if discovered.address.contains(':') && !discovered.address.starts_with('[') => {
            format!("https://[{}]:{}", discovered.address, discovered.port)
        }
        None => format!("https://{}:{}", discovered.address, discovered.port),
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn read_key(&self, key: &str) -> Result<Option<SecretRecord>, CredentialError> {
        let url = self.secret_url(key)?;

        let response = self
            .http
            .get(url)
            .header(VAULT_TOKEN_HEADER, self.token.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                CredentialError::SecretRead(format!("Error reading secret from vault server: {}", e))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(key, "No secret at key");
            return Ok(None);
        }

        if !status.is_success() {
            let body: ErrorResponse = response.json().await.unwrap_or_default();
            let detail = if body.errors.is_empty() {
                String::new()
            } else {
                format!(": {}", body.errors.join("; "))
            };
            return Err(CredentialError::SecretRead(format!(
                "vault returned status {} for '{}'{}",
                status.as_u16(),
                key,
                detail
            )));
        }

        let body: SecretResponse = response.json().await.map_err(|e| {
            CredentialError::SecretRead(format!("Invalid vault response for '{}': {}", key, e))
        })?;

        Ok(body.data)
    }
}
