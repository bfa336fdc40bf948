//! Application settings and configuration
//!
//! Settings are loaded from environment variables (and an optional `.env`
//! file) with sensible defaults, then validated once.

use crate::discovery::DEFAULT_CONSUL_ADDRESS;
use crate::secrets::{DEFAULT_TOKEN_FILENAME, DEFAULT_TOKEN_SEARCH_PATH};
use crate::services::PoolConfig;
use crate::utils::{RetryConfig, TimeoutConfig};
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Where storage credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CredentialSource {
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
    #[default]
    #[value(alias = "env")]
    Environment,
    /// A Vault secret, located through Consul
    Vault,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Vault => write!(f, "vault"),
        }
    }
}

impl std::str::FromStr for CredentialSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "environment" | "env" => Ok(CredentialSource::Environment),
            "vault" => Ok(CredentialSource::Vault),
            _ => anyhow::bail!("Invalid credential source: {}. Expected: environment or vault", s),
        }
    }
}

/// Storage client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub region: String,
    pub bucket: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            bucket: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

/// Secret store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Path of the secret holding the storage credentials
    pub secret_key: Option<String>,
    pub service_name: String,
    pub service_tag: String,
    /// Used instead of the discovered address when set
    pub address_override: Option<String>,
    pub home_dir: Option<PathBuf>,
    pub token_filename: String,
    pub token_search_paths: Vec<PathBuf>,
    pub id_field: String,
    pub key_field: String,
    pub cache_credentials: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            service_name: "vault".to_string(),
            service_tag: "active".to_string(),
            address_override: None,
            home_dir: None,
            token_filename: DEFAULT_TOKEN_FILENAME.to_string(),
            token_search_paths: DEFAULT_TOKEN_SEARCH_PATH.iter().map(PathBuf::from).collect(),
            id_field: "s3id".to_string(),
            key_field: "s3key".to_string(),
            cache_credentials: false,
        }
    }
}

/// Service discovery configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsulConfig {
    pub address: String,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONSUL_ADDRESS.to_string(),
        }
    }
}

/// Service pool configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    pub size: usize,
    pub revalidate_on_checkout: bool,
    pub retry: RetryConfig,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: 10,
            revalidate_on_checkout: false,
            retry: RetryConfig::default(),
        }
    }
}

/// Outbound HTTP configuration for discovery and secret-store calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Local source address for outbound connections
    pub bind_address: Option<IpAddr>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: None,
            user_agent: format!("aws-utils/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub log_level: String,

    pub credential_source: CredentialSource,
    pub s3: S3Config,
    pub vault: VaultConfig,
    pub consul: ConsulConfig,
    pub pool: PoolSettings,
    pub timeouts: TimeoutConfig,
    pub transport: TransportConfig,
}

impl Settings {
    /// Load and validate settings
    pub fn load() -> Result<Self> {
        let settings = Self::from_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from environment variables with defaults, without validating
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let settings = Self {
            app_name: env_or_default("APP_NAME", &defaults.app_name),
            app_version: defaults.app_version,
            log_level: env_or_default("LOG_LEVEL", &defaults.log_level),

            credential_source: env_or_default("CREDENTIAL_SOURCE", "environment").parse()?,

            s3: S3Config {
                region: env_or_default("AWS_REGION", &defaults.s3.region),
                bucket: env_opt("S3_BUCKET"),
                endpoint_url: env_opt("S3_ENDPOINT_URL"),
                force_path_style: env_or_default("S3_FORCE_PATH_STYLE", "false")
                    .parse()
                    .unwrap_or(false),
            },

            vault: VaultConfig {
                secret_key: env_opt("VAULT_SECRET_KEY"),
                service_name: env_or_default("VAULT_SERVICE_NAME", &defaults.vault.service_name),
                service_tag: env_or_default("VAULT_SERVICE_TAG", &defaults.vault.service_tag),
                address_override: env_opt("VAULT_ADDR"),
                home_dir: env_opt("HOME").map(PathBuf::from),
                token_filename: env_or_default(
                    "VAULT_TOKEN_FILENAME",
                    &defaults.vault.token_filename,
                ),
                token_search_paths: env_opt("VAULT_TOKEN_SEARCH_PATH")
                    .map(|paths| env::split_paths(&paths).collect())
                    .unwrap_or(defaults.vault.token_search_paths),
                id_field: env_or_default("VAULT_ID_FIELD", &defaults.vault.id_field),
                key_field: env_or_default("VAULT_KEY_FIELD", &defaults.vault.key_field),
                cache_credentials: env_or_default("VAULT_CACHE_CREDENTIALS", "false")
                    .parse()
                    .unwrap_or(false),
            },

            consul: ConsulConfig {
                address: env_or_default("CONSUL_HTTP_ADDR", &defaults.consul.address),
            },

            pool: PoolSettings {
                size: env_or_default("SERVICE_POOL_SIZE", "10")
                    .parse()
                    .context("Invalid SERVICE_POOL_SIZE value")?,
                revalidate_on_checkout: env_or_default("SERVICE_POOL_REVALIDATE", "false")
                    .parse()
                    .unwrap_or(false),
                retry: RetryConfig::default()
                    .with_max_attempts(
                        env_or_default("AWS_OPERATION_RETRY_COUNT", "50")
                            .parse()
                            .context("Invalid AWS_OPERATION_RETRY_COUNT value")?,
                    )
                    .with_initial_delay(Duration::from_millis(
                        env_or_default("RETRY_INITIAL_DELAY_MS", "100")
                            .parse()
                            .context("Invalid RETRY_INITIAL_DELAY_MS value")?,
                    ))
                    .with_max_delay(Duration::from_secs(
                        env_or_default("RETRY_MAX_DELAY_SECS", "300")
                            .parse()
                            .context("Invalid RETRY_MAX_DELAY_SECS value")?,
                    )),
            },

            timeouts: TimeoutConfig::from_env(),

            transport: TransportConfig {
                bind_address: env_opt("BIND_ADDRESS")
                    .map(|addr| addr.parse::<IpAddr>())
                    .transpose()
                    .context("Invalid BIND_ADDRESS value")?,
                ..defaults.transport
            },
        };

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.pool.size == 0 {
            anyhow::bail!("Service pool size must be > 0");
        }

        if self.pool.retry.max_attempts == 0 {
            anyhow::bail!("Retry count must be > 0");
        }

        if self.pool.retry.max_delay < self.pool.retry.initial_delay {
            anyhow::bail!("Retry max delay must not be below the initial delay");
        }

        if self.s3.region.trim().is_empty() {
            anyhow::bail!("AWS region cannot be empty");
        }

        if self.credential_source == CredentialSource::Vault {
            match &self.vault.secret_key {
                Some(key) if !key.trim().is_empty() => {}
                _ => anyhow::bail!("VAULT_SECRET_KEY is required when CREDENTIAL_SOURCE=vault"),
            }
        }

        Ok(())
    }

    /// Pool configuration derived from the pool and timeout sections
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.pool.size)
            .with_retry(self.pool.retry.clone())
            .with_session_timeout(self.timeouts.session_timeout)
            .with_revalidate_on_checkout(self.pool.revalidate_on_checkout)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "aws-utils".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            credential_source: CredentialSource::default(),
            s3: S3Config::default(),
            vault: VaultConfig::default(),
            consul: ConsulConfig::default(),
            pool: PoolSettings::default(),
            timeouts: TimeoutConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Environment variable, treating empty values as unset
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "aws-utils");
        assert_eq!(settings.s3.region, "us-east-1");
        assert_eq!(settings.credential_source, CredentialSource::Environment);
        assert_eq!(settings.pool.size, 10);
        assert_eq!(settings.pool.retry.max_attempts, 50);
        assert_eq!(settings.vault.service_name, "vault");
        assert_eq!(settings.vault.service_tag, "active");
        assert_eq!(settings.vault.token_filename, ".vault-token");
        assert_eq!(settings.vault.token_search_paths, vec![PathBuf::from("/var")]);
        assert_eq!(settings.consul.address, "http://localhost:8500");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_credential_source_parsing() {
        assert_eq!("environment".parse::<CredentialSource>().unwrap(), CredentialSource::Environment);
        assert_eq!("env".parse::<CredentialSource>().unwrap(), CredentialSource::Environment);
        assert_eq!("Vault".parse::<CredentialSource>().unwrap(), CredentialSource::Vault);
        assert!("consul".parse::<CredentialSource>().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_pool_size() {
        let mut settings = Settings::default();
        settings.pool.size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retry_budget() {
        let mut settings = Settings::default();
        settings.pool.retry.max_attempts = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let mut settings = Settings::default();
        settings.pool.retry.max_delay = Duration::from_millis(10);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_vault_requires_secret_key() {
        let mut settings = Settings::default();
        settings.credential_source = CredentialSource::Vault;
        assert!(settings.validate().is_err());

        settings.vault.secret_key = Some("secret/s3".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_pool_config_from_settings() {
        let mut settings = Settings::default();
        settings.pool.size = 4;
        settings.pool.revalidate_on_checkout = true;
        settings.timeouts.session_timeout = Duration::from_secs(5);

        let config = settings.pool_config();
        assert_eq!(config.capacity, 4);
        assert!(config.revalidate_on_checkout);
        assert_eq!(config.session_timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 50);
    }
}
