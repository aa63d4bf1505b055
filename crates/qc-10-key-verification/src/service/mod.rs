//! # Key Authorization Service
//!
//! Application service wiring the pre-handle pipeline:
//!
//! ```text
//! envelope pairs + required keys
//!        │
//!        ├─→ PrimitiveSignatureCollector ──→ selected pairs per key
//!        │                                        │
//!        │                                        ↓
//!        ├─→ SignatureExpander::expand_for_key ──→ ┐
//!        └─→ SignatureExpander::expand_all ──────→ ┤  (hollow-account aliases)
//!                                                  ↓
//!                                  VerificationDispatcher ──→ CryptoEngine
//!                                                  │
//!                                                  ↓
//!                                       DefaultKeyVerifier (handling phase)
//! ```

pub mod delegating;
pub mod dispatcher;
pub mod verifier;

use crate::config::VerificationConfig;
use crate::domain::collector::PrimitiveSignatureCollector;
use crate::domain::entities::{ExpandedSignaturePair, Message, SignaturePair};
use crate::domain::errors::VerificationError;
use crate::domain::expander::SignatureExpander;
use crate::domain::key::Key;
use crate::ports::outbound::CryptoEngine;
use dispatcher::VerificationDispatcher;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use verifier::DefaultKeyVerifier;

/// Pre-handles transactions into key verifiers.
pub struct KeyAuthorizationService<E: CryptoEngine> {
    dispatcher: VerificationDispatcher<E>,
    expander: SignatureExpander,
    config: VerificationConfig,
}

impl<E: CryptoEngine> KeyAuthorizationService<E> {
    /// Create a new service.
    ///
    /// # Errors
    /// * `VerificationError::InvalidConfig` - the configuration is out of range
    pub fn new(engine: Arc<E>, config: VerificationConfig) -> Result<Self, VerificationError> {
        config.validate()?;
        Ok(Self {
            dispatcher: VerificationDispatcher::new(engine),
            expander: SignatureExpander::new(),
            config,
        })
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Select, expand and dispatch the signatures of one transaction.
    ///
    /// `required_keys` are the keys the handling phase will ask about. Every
    /// primitive member of a required key with a matching pair is dispatched,
    /// even when signatures alone cannot satisfy the key: contract members may
    /// still be authorized by a verification assistant. Pairs carrying a
    /// complete public key are dispatched as well, so that hollow accounts can
    /// be looked up by EVM alias.
    pub fn pre_handle(
        &self,
        message: &Message,
        pairs: &[SignaturePair],
        required_keys: &[Key],
    ) -> DefaultKeyVerifier {
        let collector = PrimitiveSignatureCollector::new(pairs);
        let mut expanded: BTreeSet<ExpandedSignaturePair> = BTreeSet::new();
        for key in required_keys {
            if collector.collect(key).is_none() {
                debug!("[qc-10] Signatures alone cannot satisfy a required key");
            }
            self.expander.expand_for_key(pairs, key, &mut expanded);
        }
        self.expander.expand_all(pairs, &mut expanded);

        let dispatched = self.dispatcher.dispatch(message, &expanded);
        DefaultKeyVerifier::new(&self.config, dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SignatureVerification;
    use crate::domain::key::{ContractId, KeyAlgorithm};
    use crate::ports::inbound::KeyVerifier;
    use crate::test_helpers::{ed_key, ScriptedEngine};

    fn partial_pair(byte: u8) -> SignaturePair {
        SignaturePair::new(KeyAlgorithm::Ed25519, vec![byte; 3], vec![byte; 64])
    }

    fn service(
        engine: ScriptedEngine,
    ) -> (Arc<ScriptedEngine>, KeyAuthorizationService<ScriptedEngine>) {
        let engine = Arc::new(engine);
        let config = VerificationConfig::for_testing();
        let service = KeyAuthorizationService::new(engine.clone(), config).unwrap();
        (engine, service)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = KeyAuthorizationService::new(
            Arc::new(ScriptedEngine::accepting_all()),
            VerificationConfig {
                verification_timeout_millis: 0,
            },
        );
        assert!(matches!(result, Err(VerificationError::InvalidConfig { .. })));
    }

    #[test]
    fn test_partial_prefixes_resolved_through_required_key() {
        let (engine, service) = service(ScriptedEngine::accepting_all());
        let key = Key::threshold(2, vec![ed_key(1), ed_key(2), ed_key(3)]);
        let pairs = vec![partial_pair(1), partial_pair(3)];

        let verifier = service.pre_handle(&Message::raw(b"tx".to_vec()), &pairs, &[key.clone()]);

        assert!(verifier.verification_for(&key).has_passed());
        assert_eq!(verifier.num_signatures_verified(), 2);
        assert_eq!(engine.requests().len(), 2);
    }

    #[test]
    fn test_unsatisfiable_key_still_dispatches_matching_members() {
        let (engine, service) = service(ScriptedEngine::accepting_all());
        let key = Key::list(vec![ed_key(1), ed_key(2)]);
        let pairs = vec![partial_pair(1)];

        let verifier = service.pre_handle(&Message::raw(b"tx".to_vec()), &pairs, &[key.clone()]);

        assert!(verifier.verification_for(&key).has_failed());
        assert!(verifier.verification_for(&ed_key(1)).has_passed());
        assert_eq!(verifier.num_signatures_verified(), 1);
        assert_eq!(engine.requests().len(), 1);
    }

    #[test]
    fn test_partial_prefix_dispatched_for_key_with_contract_member() {
        let (engine, service) = service(ScriptedEngine::accepting_all());
        let calling = ContractId::new(0, 0, 1001);
        let key = Key::threshold(2, vec![ed_key(1), Key::ContractId(calling)]);
        let pairs = vec![partial_pair(1)];

        let verifier = service.pre_handle(&Message::raw(b"tx".to_vec()), &pairs, &[key.clone()]);

        assert_eq!(engine.requests().len(), 1);
        assert!(verifier.verification_for(&key).has_failed());
        let assistant = |key: &Key, intermediate: &SignatureVerification| match key {
            Key::ContractId(id) => *id == calling,
            _ => intermediate.has_passed(),
        };
        assert!(verifier
            .verification_for_with_assistant(&key, &assistant)
            .has_passed());
    }

    #[test]
    fn test_threshold_over_collection_dispatches_every_candidate() {
        let (engine, service) = service(ScriptedEngine::accepting_keys(vec![vec![3; 32]]));
        let key = Key::threshold(1, vec![ed_key(1), ed_key(2), ed_key(3)]);
        // All three claim to sign; only C is valid.
        let pairs = vec![partial_pair(1), partial_pair(2), partial_pair(3)];

        let verifier = service.pre_handle(&Message::raw(b"tx".to_vec()), &pairs, &[key.clone()]);

        assert_eq!(engine.requests().len(), 3);
        assert!(verifier.verification_for(&key).has_passed());
        assert_eq!(
            verifier.authorizing_simple_keys().into_iter().collect::<Vec<_>>(),
            vec![ed_key(3)]
        );
    }

    #[test]
    fn test_full_prefix_pairs_dispatched_without_required_key() {
        let (_, service) = service(ScriptedEngine::accepting_all());
        let pairs = vec![SignaturePair::new(KeyAlgorithm::Ed25519, vec![9; 32], vec![0; 64])];

        let verifier = service.pre_handle(&Message::raw(b"tx".to_vec()), &pairs, &[]);

        assert_eq!(verifier.num_signatures_verified(), 1);
        assert!(verifier.verification_for(&ed_key(9)).has_passed());
    }
}
