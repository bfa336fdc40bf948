//! AWS SDK configuration
//!
//! Converts a [`CredentialProvider`] into the SDK's own credentials provider at a
//! single boundary, and builds S3 clients from it. The SDK never sees the
//! provider trait object directly.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::{error::CredentialsError, future, ProvideCredentials};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use std::fmt;

use crate::config::S3Config;
use crate::credentials::{Credential, SharedCredentialProvider};
use crate::error::CredentialError;
use crate::transport::SdkHttpClient;

/// Convert a credential into SDK credentials, rejecting empty halves
pub fn to_sdk_credentials(
    credential: &Credential,
    provider_name: &'static str,
) -> Result<Credentials, CredentialError> {
    if credential.access_key_id().is_empty() || credential.secret_key().is_empty() {
        return Err(CredentialError::Configuration(format!(
            "{} provider returned an incomplete credential",
            provider_name
        )));
    }

    Ok(Credentials::new(
        credential.access_key_id(),
        credential.secret_key(),
        None,
        None,
        provider_name,
    ))
}

/// Exposes a [`CredentialProvider`](crate::credentials::CredentialProvider) as an SDK credentials provider
#[derive(Clone)]
pub struct SdkCredentialsAdapter {
    provider: SharedCredentialProvider,
}

impl fmt::Debug for SdkCredentialsAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkCredentialsAdapter")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl SdkCredentialsAdapter {
    pub fn new(provider: SharedCredentialProvider) -> Self {
        Self { provider }
    }

    /// Fetch from the wrapped provider and convert
    pub async fn resolve(&self) -> Result<Credentials, CredentialError> {
        let credential = self.provider.fetch().await?;
        to_sdk_credentials(&credential, self.provider.name())
    }
}

impl ProvideCredentials for SdkCredentialsAdapter {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(async move {
            self.resolve().await.map_err(CredentialsError::provider_error)
        })
    }
}

/// AWS configuration builder for S3 clients
pub struct AwsConfigBuilder<'a> {
    s3: &'a S3Config,
    http_client: Option<SdkHttpClient>,
}

impl<'a> AwsConfigBuilder<'a> {
    pub fn new(s3: &'a S3Config) -> Self {
        Self {
            s3,
            http_client: None,
        }
    }

    /// Send SDK traffic through this client instead of the SDK's default connector
    pub fn with_http_client(mut self, http_client: SdkHttpClient) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Build the base SDK configuration with the configured region, credentials and transport
    pub async fn build_sdk_config(&self, credentials: SdkCredentialsAdapter) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.s3.region.clone()))
            .credentials_provider(credentials);

        if let Some(http_client) = &self.http_client {
            loader = loader.http_client(http_client.clone());
        }

        loader.load().await
    }

    /// Create an S3 client with optional custom endpoint
    ///
    /// If `S3_ENDPOINT_URL` is set, the client uses that endpoint (useful for
    /// MinIO or LocalStack).
    pub fn build_s3_client(&self, sdk_config: &SdkConfig) -> S3Client {
        let mut builder =
            aws_sdk_s3::config::Builder::from(sdk_config).force_path_style(self.s3.force_path_style);

        if let Some(endpoint_url) = &self.s3.endpoint_url {
            tracing::debug!(endpoint = %endpoint_url, "Using custom S3 endpoint");
            builder = builder.endpoint_url(endpoint_url);
        }

        S3Client::from_conf(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::EnvironmentProvider;
    use reqwest::header::{HeaderMap, HeaderValue};
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIST_BUCKETS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Owner><ID>owner</ID></Owner>
  <Buckets>
    <Bucket><Name>uploads</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;

    fn env_adapter(vars: &[(&str, &str)]) -> SdkCredentialsAdapter {
        SdkCredentialsAdapter::new(Arc::new(EnvironmentProvider::from_vars(vars.iter().copied())))
    }

    #[test]
    fn test_to_sdk_credentials() {
        let creds = to_sdk_credentials(&Credential::new("AKIAEXAMPLE", "abc123"), "vault").unwrap();
        assert_eq!(creds.access_key_id(), "AKIAEXAMPLE");
        assert_eq!(creds.secret_access_key(), "abc123");
        assert!(creds.session_token().is_none());
    }

    #[test]
    fn test_to_sdk_credentials_rejects_empty() {
        let result = to_sdk_credentials(&Credential::new("", "abc123"), "vault");
        assert!(matches!(result, Err(CredentialError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_adapter_provides_credentials() {
        let adapter = env_adapter(&[
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "abc123"),
        ]);

        let creds = adapter.provide_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKIAEXAMPLE");
        assert_eq!(creds.secret_access_key(), "abc123");
    }

    #[tokio::test]
    async fn test_adapter_surfaces_provider_errors() {
        let adapter = env_adapter(&[("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE")]);
        assert!(adapter.provide_credentials().await.is_err());
    }

    #[tokio::test]
    async fn test_build_sdk_config() {
        let s3 = S3Config {
            region: "eu-west-1".to_string(),
            ..S3Config::default()
        };
        let adapter = env_adapter(&[
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "abc123"),
        ]);

        let config = AwsConfigBuilder::new(&s3).build_sdk_config(adapter).await;
        assert_eq!(config.region().unwrap().as_ref(), "eu-west-1");
        assert!(config.credentials_provider().is_some());
    }

    #[tokio::test]
    async fn test_custom_endpoint_s3_client() {
        let s3 = S3Config {
            endpoint_url: Some("http://localhost:9000".to_string()),
            force_path_style: true,
            ..S3Config::default()
        };
        let adapter = env_adapter(&[
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "abc123"),
        ]);

        let builder = AwsConfigBuilder::new(&s3);
        let sdk_config = builder.build_sdk_config(adapter).await;
        let client = builder.build_s3_client(&sdk_config);
        assert_eq!(client.config().region().unwrap().as_ref(), "us-east-1");
    }

    #[tokio::test]
    async fn test_s3_client_uses_configured_http_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("x-transport", "aws-utils-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(LIST_BUCKETS_XML),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut marker = HeaderMap::new();
        marker.insert("x-transport", HeaderValue::from_static("aws-utils-test"));
        let http = reqwest::Client::builder().default_headers(marker).build().unwrap();

        let s3 = S3Config {
            endpoint_url: Some(server.uri()),
            force_path_style: true,
            ..S3Config::default()
        };
        let adapter = env_adapter(&[
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "abc123"),
        ]);

        let builder = AwsConfigBuilder::new(&s3).with_http_client(SdkHttpClient::new(http));
        let sdk_config = builder.build_sdk_config(adapter).await;
        assert!(sdk_config.http_client().is_some());

        let client = builder.build_s3_client(&sdk_config);
        let output = client.list_buckets().send().await.unwrap();
        assert_eq!(output.buckets()[0].name(), Some("uploads"));
    }
}
