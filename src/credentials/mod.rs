//! Credential providers
//!
//! A [`CredentialProvider`] produces the access-key/secret-key pair used to sign
//! storage requests. Two sources exist:
//! - [`EnvironmentProvider`]: well-known `AWS_*` environment variables
//! - [`SecretBackedProvider`]: a record in the secret store, located via service discovery
//!
//! Either can be wrapped in a [`CachedProvider`] so that `expire()` is meaningful.
//!
//! # Example
//! ```ignore
//! let settings = Settings::load()?;
//! let provider = provider_from_settings(&settings).await?;
//! let credential = provider.fetch().await?;
//! println!("Using access key {}", credential.access_key_id());
//! ```

mod cached;
mod environment;
mod secret_backed;

pub use cached::CachedProvider;
pub use environment::{EnvironmentProvider, ACCESS_KEY_ID_VARS, SECRET_KEY_VARS};
pub use secret_backed::{SecretBackedProvider, SecretFields};

use crate::config::{CredentialSource, Settings};
use crate::discovery::ConsulDiscovery;
use crate::error::CredentialError;
use crate::secrets::VaultClient;
use crate::transport::build_http_client;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Credential
// ============================================================================

/// An access-key/secret-key pair. Never mutated; refreshed by replacement.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    access_key_id: String,
    secret_key: String,
}

impl Credential {
    pub fn new(access_key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Credential Provider Trait
// ============================================================================

/// Capability to fetch, invalidate and report expiry of a [`Credential`].
///
/// Providers are shared by every service handle built from them, so all methods
/// take `&self` and implementations must tolerate concurrent `fetch`/`expire`.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short source name used in logs and as the SDK provider name
    fn name(&self) -> &'static str;

    /// Resolve the current credential
    async fn fetch(&self) -> Result<Credential, CredentialError>;

    /// Mark any held credential as stale so the next `fetch` re-resolves
    fn expire(&self) {}

    /// Whether the held credential is known to be stale
    fn is_expired(&self) -> bool {
        false
    }
}

/// Provider handle shared between the pool and every handle it builds
pub type SharedCredentialProvider = Arc<dyn CredentialProvider>;

/// Build the provider selected by `settings.credential_source`.
///
/// Construction failures (missing environment variables, discovery, token or
/// configuration problems) are returned as-is; there is no fallback between
/// sources.
pub async fn provider_from_settings(
    settings: &Settings,
) -> Result<SharedCredentialProvider, CredentialError> {
    match settings.credential_source {
        CredentialSource::Environment => {
            tracing::debug!("Loading credentials from environment");
            Ok(Arc::new(EnvironmentProvider::load()?))
        }
        CredentialSource::Vault => {
            let vault = &settings.vault;
            let secret_key = vault.secret_key.clone().ok_or_else(|| {
                CredentialError::Configuration("VAULT_SECRET_KEY is required for the vault source".to_string())
            })?;

            let http = build_http_client(&settings.transport, &settings.timeouts)?;
            let discovery = ConsulDiscovery::new(http.clone(), &settings.consul.address);
            let client = VaultClient::discover(&discovery, vault, http).await?;

            let fields = SecretFields::new(&vault.id_field, &vault.key_field);
            let provider = SecretBackedProvider::new(Arc::new(client), secret_key, fields)?;

            if vault.cache_credentials {
                Ok(Arc::new(CachedProvider::new(provider)))
            } else {
                Ok(Arc::new(provider))
            }
        }
    }
}
