//! # Inbound Ports (Driving Ports / API)
//!
//! The key verifier API consumed by transaction handlers, fee calculation
//! and record building.

use crate::domain::entities::SignatureVerification;
use crate::domain::key::Key;
use std::collections::BTreeSet;

/// Caller-supplied override for leaf keys.
///
/// Consulted for primitive, `ContractId` and `DelegatableContractId` keys with
/// the intermediate cryptographic verdict; its answer is the final verdict.
pub type VerificationAssistant<'a> = dyn Fn(&Key, &SignatureVerification) -> bool + 'a;

/// Resolves keys into pass/fail verdicts.
///
/// None of these methods return errors: anomalies such as timeouts degrade
/// to a failed verdict. Implementations must be thread-safe (`Send + Sync`).
pub trait KeyVerifier: Send + Sync {
    /// Verdict for `key` from its cryptographic signatures alone.
    fn verification_for(&self, key: &Key) -> SignatureVerification;

    /// Verdict for `key`, letting `assistant` decide every leaf key.
    fn verification_for_with_assistant(
        &self,
        key: &Key,
        assistant: &VerificationAssistant<'_>,
    ) -> SignatureVerification;

    /// Verdict for the secp256k1 key whose EVM alias is `evm_alias`.
    ///
    /// Anything other than exactly 20 bytes fails without a lookup.
    fn verification_for_alias(&self, evm_alias: &[u8]) -> SignatureVerification;

    /// Number of cryptographic checks dispatched for this transaction.
    fn num_signatures_verified(&self) -> usize;

    /// Primitive keys whose signatures passed, in key order.
    fn authorizing_simple_keys(&self) -> BTreeSet<Key>;
}
