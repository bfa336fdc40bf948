//! AWS utilities library
//!
//! Resolves storage credentials from the environment or from Vault (located
//! through Consul) and hands out pooled, retry-hardened S3 service handles.

// Public modules
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod secrets;
pub mod services;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use credentials::{provider_from_settings, Credential, CredentialProvider, SharedCredentialProvider};
pub use error::{CredentialError, PoolError, SessionError};
pub use services::{PoolConfig, S3Handle, S3ServiceProvider, ServicePool};
