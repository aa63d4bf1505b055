//! # Delegating Key Verifier
//!
//! Synchronous variant for callers without dispatched handles: a predicate
//! decides primitive keys directly. List/threshold rules and the assistant
//! contract are identical to [`DefaultKeyVerifier`](super::verifier::DefaultKeyVerifier),
//! so callers can swap one for the other.

use crate::domain::entities::SignatureVerification;
use crate::domain::key::Key;
use crate::domain::policy::compose_verdict;
use crate::ports::inbound::{KeyVerifier, VerificationAssistant};
use std::collections::BTreeSet;

/// Key verifier backed by a synchronous primitive-key predicate.
pub struct DelegatingKeyVerifier<P>
where
    P: Fn(&Key) -> bool + Send + Sync,
{
    predicate: P,
}

impl<P> DelegatingKeyVerifier<P>
where
    P: Fn(&Key) -> bool + Send + Sync,
{
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }

    /// Verdict the predicate gives a leaf; only primitive keys can pass.
    fn leaf_verification(&self, key: &Key) -> SignatureVerification {
        let passed = key.is_primitive() && (self.predicate)(key);
        SignatureVerification::new(key.clone(), None, passed)
    }
}

impl<P> KeyVerifier for DelegatingKeyVerifier<P>
where
    P: Fn(&Key) -> bool + Send + Sync,
{
    fn verification_for(&self, key: &Key) -> SignatureVerification {
        compose_verdict(key, &mut |leaf: &Key| self.leaf_verification(leaf))
    }

    fn verification_for_with_assistant(
        &self,
        key: &Key,
        assistant: &VerificationAssistant<'_>,
    ) -> SignatureVerification {
        compose_verdict(key, &mut |leaf: &Key| {
            let intermediate = self.leaf_verification(leaf);
            let passed = assistant(leaf, &intermediate);
            SignatureVerification::new(leaf.clone(), None, passed)
        })
    }

    /// No aliases are known without dispatched secp256k1 keys.
    fn verification_for_alias(&self, _evm_alias: &[u8]) -> SignatureVerification {
        SignatureVerification::failed(Key::Unset, None)
    }

    fn num_signatures_verified(&self) -> usize {
        0
    }

    fn authorizing_simple_keys(&self) -> BTreeSet<Key> {
        BTreeSet::new()
    }
}
