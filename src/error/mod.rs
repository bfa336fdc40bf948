//! Error types
//!
//! Credential resolution failures, single handle-construction attempt
//! failures, and terminal pool failures.

mod types;

pub use types::{CredentialError, PoolError, SessionError};
