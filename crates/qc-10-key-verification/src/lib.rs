//! # Key Verification Subsystem (QC-10)
//!
//! Decides whether the signatures attached to a transaction satisfy the
//! authorization policy of a (possibly compound) key.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): key model, signature selection and expansion,
//!   verdict composition, verification handles
//! - **Ports Layer** (`ports/`): the `KeyVerifier` API and the `CryptoEngine` SPI
//! - **Service Layer** (`service/`): dispatch to the engine and key resolution
//! - **Adapters** (`adapters/`): a rayon-backed crypto engine
//!
//! ## Consensus Notes
//!
//! - Every resolution is bounded by `VerificationConfig::verification_timeout_millis`;
//!   a key that cannot be resolved in time is treated as unauthorized
//! - Threshold keys dispatch every candidate signature, not just the first M
//! - Malformed secp256k1 prefixes are skipped, never reported as errors

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(test)]
pub mod test_helpers;

// Re-export public API
pub use adapters::engine::{verify_signature, PendingVerification, RayonCryptoEngine};
pub use config::VerificationConfig;
pub use domain::collector::PrimitiveSignatureCollector;
pub use domain::ecdsa::{evm_alias_from_compressed, keccak256};
pub use domain::entities::{
    EvmAlias, ExpandedSignaturePair, Message, SignaturePair, SignatureVerification,
};
pub use domain::errors::{ResolveError, VerificationError};
pub use domain::expander::SignatureExpander;
pub use domain::handle::{CompositeVerificationHandle, ResolvedHandle, VerificationHandle};
pub use domain::key::{ContractId, Key, KeyAlgorithm};
pub use domain::policy::{clamped_threshold, MemberPolicy};
pub use ports::inbound::{KeyVerifier, VerificationAssistant};
pub use ports::outbound::{CryptoEngine, CryptoHandle};
pub use service::delegating::DelegatingKeyVerifier;
pub use service::dispatcher::{DispatchedVerifications, VerificationDispatcher};
pub use service::verifier::DefaultKeyVerifier;
pub use service::KeyAuthorizationService;
