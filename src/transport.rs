//! Outbound HTTP transport
//!
//! One `reqwest` client setup serves discovery, secret-store and S3 traffic, so
//! the bind address and timeouts apply everywhere. [`SdkHttpClient`] plugs that
//! client into the AWS SDK.

use aws_smithy_runtime_api::client::http::{
    HttpClient, HttpConnector, HttpConnectorFuture, HttpConnectorSettings, SharedHttpConnector,
};
use aws_smithy_runtime_api::client::orchestrator::{HttpRequest, HttpResponse};
use aws_smithy_runtime_api::client::result::ConnectorError;
use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
use aws_smithy_runtime_api::http::StatusCode;
use aws_smithy_types::body::SdkBody;
use aws_smithy_types::byte_stream::ByteStream;

use crate::config::TransportConfig;
use crate::error::CredentialError;
use crate::utils::TimeoutConfig;

/// Build the HTTP client for outbound traffic.
///
/// Proxy settings are taken from the environment (reqwest's default). When a
/// bind address is configured, every connection uses it as the local source.
pub fn build_http_client(
    transport: &TransportConfig,
    timeouts: &TimeoutConfig,
) -> Result<reqwest::Client, CredentialError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(transport.user_agent.as_str())
        .connect_timeout(timeouts.connect_timeout)
        .timeout(timeouts.request_timeout);

    if let Some(local) = transport.bind_address {
        tracing::info!(local_address = %local, "Binding outbound connections to local address");
        builder = builder.local_address(local);
    }

    builder
        .build()
        .map_err(|e| CredentialError::Configuration(format!("Couldn't build HTTP client: {}", e)))
}

/// [`build_http_client`] wrapped for the AWS SDK
pub fn build_sdk_http_client(
    transport: &TransportConfig,
    timeouts: &TimeoutConfig,
) -> Result<SdkHttpClient, CredentialError> {
    Ok(SdkHttpClient::new(build_http_client(transport, timeouts)?))
}

// ============================================================================
// AWS SDK HTTP client
// ============================================================================

/// Sends AWS SDK requests through a `reqwest` client
#[derive(Debug, Clone)]
pub struct SdkHttpClient {
    http: reqwest::Client,
}

impl SdkHttpClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl HttpClient for SdkHttpClient {
    fn http_connector(
        &self,
        _settings: &HttpConnectorSettings,
        _components: &RuntimeComponents,
    ) -> SharedHttpConnector {
        SharedHttpConnector::new(ReqwestConnector {
            http: self.http.clone(),
        })
    }
}

#[derive(Debug)]
struct ReqwestConnector {
    http: reqwest::Client,
}

impl HttpConnector for ReqwestConnector {
    fn call(&self, request: HttpRequest) -> HttpConnectorFuture {
        let http = self.http.clone();
        HttpConnectorFuture::new(async move { send(http, request).await })
    }
}

async fn send(http: reqwest::Client, mut request: HttpRequest) -> Result<HttpResponse, ConnectorError> {
    let method = reqwest::Method::from_bytes(request.method().as_bytes())
        .map_err(|e| ConnectorError::user(e.into()))?;

    let mut builder = http.request(method, request.uri());
    for (name, value) in request.headers().iter() {
        builder = builder.header(name, value);
    }

    // Streaming bodies are buffered; reqwest 0.11 has no SdkBody conversion
    let body = std::mem::replace(request.body_mut(), SdkBody::taken());
    let in_memory = body.bytes().map(<[u8]>::to_vec);
    let payload = match in_memory {
        Some(bytes) => bytes,
        None => ByteStream::new(body)
            .collect()
            .await
            .map_err(|e| ConnectorError::io(e.into()))?
            .to_vec(),
    };

    let response = builder.body(payload).send().await.map_err(connector_error)?;

    let status = StatusCode::try_from(response.status().as_u16())
        .map_err(|e| ConnectorError::other(e.into(), None))?;
    let headers = response.headers().clone();
    let bytes = response.bytes().await.map_err(connector_error)?;

    let mut sdk_response = HttpResponse::new(status, SdkBody::from(bytes));
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            sdk_response
                .headers_mut()
                .append(name.as_str().to_owned(), value.to_owned());
        }
    }

    Ok(sdk_response)
}

fn connector_error(err: reqwest::Error) -> ConnectorError {
    if err.is_timeout() {
        ConnectorError::timeout(err.into())
    } else if err.is_connect() {
        ConnectorError::io(err.into())
    } else {
        ConnectorError::other(err.into(), None)
    }
}
