//! Configuration management module
//!
//! This module handles loading and validating configuration from environment
//! variables and .env files, and adapts credential providers to the AWS SDK.

pub mod aws;
pub mod settings;

pub use aws::{to_sdk_credentials, AwsConfigBuilder, SdkCredentialsAdapter};
pub use settings::{
    ConsulConfig, CredentialSource, PoolSettings, S3Config, Settings, TransportConfig, VaultConfig,
};
