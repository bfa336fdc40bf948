//! Secret store access
//!
//! The secret store (Vault) is located through service discovery, authenticated
//! with a token found on the local filesystem, and read by key.

mod token;
mod vault;

pub use token::{TokenSearch, DEFAULT_TOKEN_FILENAME, DEFAULT_TOKEN_SEARCH_PATH};
pub use vault::{VaultClient, VAULT_TOKEN_HEADER};

use crate::error::CredentialError;
use async_trait::async_trait;

/// Field name to value mapping stored under a secret key
pub type SecretRecord = serde_json::Map<String, serde_json::Value>;

/// Keyed reads from a secret store.
///
/// Reads are not retried internally; retry belongs to the caller.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the record at `key`. `Ok(None)` means the store has no record there.
    async fn read_key(&self, key: &str) -> Result<Option<SecretRecord>, CredentialError>;
}
