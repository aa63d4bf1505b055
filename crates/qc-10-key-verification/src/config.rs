//! # Verification Configuration
//!
//! Node-level settings for blocking resolution. Loading from disk or the
//! environment belongs to the node runtime; this is just the value type.

use crate::domain::errors::VerificationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on one top-level key resolution.
pub const DEFAULT_VERIFICATION_TIMEOUT_MILLIS: u64 = 20_000;

/// Key verification configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Upper bound, in milliseconds, on every top-level `verification_for*` call.
    /// Every node must use the same value; a node that gives up earlier than
    /// its peers may reach a different verdict.
    pub verification_timeout_millis: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            verification_timeout_millis: DEFAULT_VERIFICATION_TIMEOUT_MILLIS,
        }
    }
}

impl VerificationConfig {
    /// Create a new configuration with validation.
    pub fn new(verification_timeout_millis: u64) -> Result<Self, VerificationError> {
        let config = Self {
            verification_timeout_millis,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a config for testing (short timeout).
    pub fn for_testing() -> Self {
        Self {
            verification_timeout_millis: 500,
        }
    }

    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.verification_timeout_millis == 0 {
            return Err(VerificationError::InvalidConfig {
                reason: "verification_timeout_millis must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_millis)
    }
}
