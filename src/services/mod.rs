//! Services module
//!
//! Pooled handles for external services.

pub mod service_pool;

pub use service_pool::{
    HandleFactory, PoolConfig, PoolStats, S3Handle, S3HandleFactory, S3ServiceProvider,
    ServiceHandle, ServicePool,
};
