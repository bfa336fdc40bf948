//! S3 service handles

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use std::fmt;

use super::handle::{HandleFactory, ServiceHandle};
use super::pool::{PoolConfig, ServicePool};
use crate::config::{AwsConfigBuilder, S3Config, SdkCredentialsAdapter, Settings};
use crate::credentials::{provider_from_settings, SharedCredentialProvider};
use crate::error::{CredentialError, SessionError};
use crate::transport::{build_sdk_http_client, SdkHttpClient};

/// Pool of S3 handles
pub type S3ServiceProvider = ServicePool<S3HandleFactory>;

impl S3ServiceProvider {
    /// Build the credential provider, the S3 transport and an empty pool from settings
    pub async fn from_settings(settings: &Settings) -> Result<Self, CredentialError> {
        let credentials = provider_from_settings(settings).await?;
        let http = build_sdk_http_client(&settings.transport, &settings.timeouts)?;
        let factory = S3HandleFactory::new(settings.s3.clone(), credentials, http);
        Ok(ServicePool::new(factory, settings.pool_config()))
    }

    pub fn with_provider(
        s3: S3Config,
        credentials: SharedCredentialProvider,
        http: SdkHttpClient,
        config: PoolConfig,
    ) -> Self {
        ServicePool::new(S3HandleFactory::new(s3, credentials, http), config)
    }
}

/// An S3 client bound to the credential provider it was built with
#[derive(Clone)]
pub struct S3Handle {
    id: u64,
    client: S3Client,
    bucket: Option<String>,
    credentials: SharedCredentialProvider,
}

impl S3Handle {
    pub fn client(&self) -> &S3Client {
        &self.client
    }

    /// Default bucket from configuration, if any
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn credentials(&self) -> &SharedCredentialProvider {
        &self.credentials
    }
}

impl fmt::Debug for S3Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Handle")
            .field("id", &self.id)
            .field("bucket", &self.bucket)
            .field("credentials", &self.credentials.name())
            .finish()
    }
}

impl ServiceHandle for S3Handle {
    fn id(&self) -> u64 {
        self.id
    }

    fn credentials_expired(&self) -> bool {
        self.credentials.is_expired()
    }
}

/// Builds S3 handles: one SDK session per handle, all sharing one credential
/// provider and one transport
pub struct S3HandleFactory {
    s3: S3Config,
    credentials: SharedCredentialProvider,
    http: SdkHttpClient,
}

impl S3HandleFactory {
    pub fn new(s3: S3Config, credentials: SharedCredentialProvider, http: SdkHttpClient) -> Self {
        Self {
            s3,
            credentials,
            http,
        }
    }

    pub fn s3_config(&self) -> &S3Config {
        &self.s3
    }
}

#[async_trait]
impl HandleFactory for S3HandleFactory {
    type Handle = S3Handle;

    async fn create(&self, id: u64) -> Result<S3Handle, SessionError> {
        let adapter = SdkCredentialsAdapter::new(self.credentials.clone());

        // Resolve once up front so credential failures fail this attempt
        adapter.resolve().await?;

        let builder = AwsConfigBuilder::new(&self.s3).with_http_client(self.http.clone());
        let sdk_config = builder.build_sdk_config(adapter).await;
        let client = builder.build_s3_client(&sdk_config);

        tracing::debug!(
            handle_id = id,
            region = %self.s3.region,
            credentials = self.credentials.name(),
            "Built S3 session"
        );

        Ok(S3Handle {
            id,
            client,
            bucket: self.s3.bucket.clone(),
            credentials: self.credentials.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credential, CredentialProvider, EnvironmentProvider};
    use crate::error::PoolError;
    use crate::utils::RetryConfig;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use crate::config::TransportConfig;
    use crate::utils::TimeoutConfig;
    use reqwest::header::{HeaderMap, HeaderValue};
    use std::net::{IpAddr, Ipv4Addr};
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
        expired: AtomicBool,
    }

    #[async_trait]
    impl CredentialProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch(&self) -> Result<Credential, CredentialError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(CredentialError::SecretRead("503 Service Unavailable".to_string()));
            }
            Ok(Credential::new("AKIAEXAMPLE", "abc123"))
        }

        fn expire(&self) {
            self.expired.store(true, Ordering::SeqCst);
        }

        fn is_expired(&self) -> bool {
            self.expired.load(Ordering::SeqCst)
        }
    }

    fn flaky(failures: u32) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            failures,
            calls: AtomicU32::new(0),
            expired: AtomicBool::new(false),
        })
    }

    fn fast_config(capacity: usize) -> PoolConfig {
        PoolConfig::new(capacity).with_retry(
            RetryConfig::new()
                .with_max_attempts(4)
                .with_initial_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(2))
                .with_jitter(false),
        )
    }

    fn default_http() -> SdkHttpClient {
        build_sdk_http_client(&TransportConfig::default(), &TimeoutConfig::default()).unwrap()
    }

    fn env_provider() -> Arc<EnvironmentProvider> {
        Arc::new(EnvironmentProvider::from_vars([
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "abc123"),
        ]))
    }

    fn local_s3() -> S3Config {
        S3Config {
            bucket: Some("uploads".to_string()),
            endpoint_url: Some("http://127.0.0.1:9000".to_string()),
            force_path_style: true,
            ..S3Config::default()
        }
    }

    #[tokio::test]
    async fn test_s3_handle_from_environment() {
        let provider = Arc::new(EnvironmentProvider::from_vars([
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "abc123"),
        ]));
        let pool = S3ServiceProvider::with_provider(local_s3(), provider, default_http(), fast_config(2));
        let cancel = CancellationToken::new();

        let handle = pool.get_handle(&cancel).await.unwrap();
        assert_eq!(handle.bucket(), Some("uploads"));
        assert_eq!(handle.credentials().name(), "environment");
        assert!(!handle.credentials_expired());
        assert_eq!(handle.client().config().region().unwrap().as_ref(), "us-east-1");

        let id = handle.id();
        pool.return_handle(handle);
        assert_eq!(pool.get_handle(&cancel).await.unwrap().id(), id);
    }

    #[tokio::test]
    async fn test_credential_failures_are_retried() {
        let provider = flaky(2);
        let pool = S3ServiceProvider::with_provider(local_s3(), provider.clone(), default_http(), fast_config(1));

        pool.get_handle(&CancellationToken::new()).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_credentials_exhaust_retries() {
        let provider = Arc::new(EnvironmentProvider::from_vars([("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE")]));
        let pool = S3ServiceProvider::with_provider(local_s3(), provider, default_http(), fast_config(1));

        let err = pool.get_handle(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            PoolError::ExhaustedRetries {
                attempts: 4,
                last_error: SessionError::Credentials(_),
            }
        ));
    }

    #[tokio::test]
    async fn test_handle_reports_provider_expiry() {
        let provider = flaky(0);
        let pool = S3ServiceProvider::with_provider(local_s3(), provider.clone(), default_http(), fast_config(1));

        let handle = pool.get_handle(&CancellationToken::new()).await.unwrap();
        assert!(!handle.credentials_expired());

        provider.expire();
        assert!(handle.credentials_expired());
    }

    #[tokio::test]
    async fn test_handles_send_through_factory_transport() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/uploads"))
            .and(header("x-transport", "bound"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let mut marker = HeaderMap::new();
        marker.insert("x-transport", HeaderValue::from_static("bound"));
        let http = reqwest::Client::builder()
            .local_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .default_headers(marker)
            .build()
            .unwrap();

        let s3 = S3Config {
            bucket: Some("uploads".to_string()),
            endpoint_url: Some(server.uri()),
            force_path_style: true,
            ..S3Config::default()
        };
        let pool = S3ServiceProvider::with_provider(
            s3,
            env_provider(),
            SdkHttpClient::new(http),
            fast_config(1),
        );
        let cancel = CancellationToken::new();

        // A fresh handle and a reused one both carry the transport
        for _ in 0..2 {
            let handle = pool.get_handle(&cancel).await.unwrap();
            handle
                .client()
                .head_bucket()
                .bucket("uploads")
                .send()
                .await
                .unwrap();
            pool.return_handle(handle);
        }
        assert_eq!(pool.stats().built, 1);
        assert_eq!(pool.stats().reused, 1);
    }
}
