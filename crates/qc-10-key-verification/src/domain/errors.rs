//! # Verification Errors
//!
//! Two families of failure:
//! - [`VerificationError`]: rejected input, fatal to the call that received it.
//! - [`ResolveError`]: anomalies while waiting on an asynchronous result. The
//!   key verifier degrades these to a failed verdict and never lets them escape.

use std::time::Duration;
use thiserror::Error;

/// Input validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// A pre-computed message hash must be exactly 32 bytes
    #[error("Invalid message hash length: expected 32, got {actual}")]
    InvalidHashLength { actual: usize },

    /// A composite handle needs at least one child
    #[error("Composite verification handle requires at least one child handle")]
    EmptyChildHandles,

    /// EVM aliases are exactly 20 bytes
    #[error("Invalid EVM alias length: expected 20, got {actual}")]
    InvalidAliasLength { actual: usize },

    /// Configuration value out of range
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Anomalies while blocking on a verification handle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The result was not available before the deadline
    #[error("Verification timed out after {waited:?}")]
    Timeout { waited: Duration },

    /// The handle was cancelled before producing a result
    #[error("Verification was cancelled")]
    Cancelled,

    /// The crypto engine failed to produce a result
    #[error("Crypto engine failure: {0}")]
    Engine(String),
}

impl ResolveError {
    /// Timeouts hint at cross-node timing divergence rather than a local bug.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResolveError::Timeout { .. })
    }
}
