//! AWS Utils
//!
//! Diagnostic CLI: resolves credentials, builds one pooled S3 handle and makes
//! a single S3 call with it.

use anyhow::{Context, Result};
use aws_utils::{
    config::{CredentialSource, Settings},
    logging::{init_tracing, LogFormat},
    services::{S3ServiceProvider, ServiceHandle},
};
use clap::Parser;
use tokio_util::sync::CancellationToken;

/// AWS Utils
///
/// Checks that storage credentials resolve and that an S3 handle can be built.
#[derive(Parser, Debug)]
#[command(name = "aws-utils")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// AWS region (overrides AWS_REGION env var)
    #[arg(short, long)]
    region: Option<String>,

    /// Bucket to check with HeadBucket; lists buckets when omitted (overrides S3_BUCKET)
    #[arg(short, long)]
    bucket: Option<String>,

    /// Credential source (overrides CREDENTIAL_SOURCE env var)
    #[arg(short, long, value_enum)]
    source: Option<CredentialSource>,

    /// Vault secret path holding the S3 key pair (overrides VAULT_SECRET_KEY)
    #[arg(long)]
    secret_key: Option<String>,

    /// Custom S3 endpoint, e.g. MinIO (overrides S3_ENDPOINT_URL)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::from_env()?;

    if let Some(region) = args.region {
        settings.s3.region = region;
    }
    if let Some(bucket) = args.bucket {
        settings.s3.bucket = Some(bucket);
    }
    if let Some(source) = args.source {
        settings.credential_source = source;
    }
    if let Some(secret_key) = args.secret_key {
        settings.vault.secret_key = Some(secret_key);
    }
    if let Some(endpoint_url) = args.endpoint_url {
        settings.s3.endpoint_url = Some(endpoint_url);
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    settings.validate()?;

    init_tracing(&settings.log_level, args.log_format)?;

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        credential_source = %settings.credential_source,
        region = %settings.s3.region,
        "Starting"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let pool = S3ServiceProvider::from_settings(&settings)
        .await
        .context("Couldn't set up credential provider")?;

    let handle = pool
        .get_handle(&cancel)
        .await
        .context("Couldn't create S3 service")?;

    match handle.bucket() {
        Some(bucket) => {
            handle
                .client()
                .head_bucket()
                .bucket(bucket)
                .send()
                .await
                .with_context(|| format!("HeadBucket failed for {}", bucket))?;
            tracing::info!(handle_id = handle.id(), bucket = %bucket, "Bucket is reachable");
        }
        None => {
            let output = handle
                .client()
                .list_buckets()
                .send()
                .await
                .context("ListBuckets failed")?;
            tracing::info!(
                handle_id = handle.id(),
                buckets = output.buckets().len(),
                "Listed buckets"
            );
        }
    }

    pool.return_handle(handle);

    let stats = pool.stats();
    tracing::info!(
        built = stats.built,
        reused = stats.reused,
        idle = stats.idle,
        "Done"
    );

    Ok(())
}
