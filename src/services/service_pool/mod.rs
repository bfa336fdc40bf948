//! Service Pool Module
//!
//! Pooled, retry-hardened service handles. A [`ServicePool`] keeps up to
//! `capacity` idle handles and builds new ones through a [`HandleFactory`],
//! retrying failed builds with exponential backoff.

mod handle;
mod pool;
mod s3;

pub use handle::{HandleFactory, ServiceHandle};
pub use pool::{PoolConfig, PoolStats, ServicePool};
pub use s3::{S3Handle, S3HandleFactory, S3ServiceProvider};
