//! # Verification Dispatcher
//!
//! Submits one engine request per expanded signature pair and maps each
//! primitive key to a handle for its cryptographic verdict. Compound keys are
//! not built here; the key verifier composes them lazily over this mapping.

use crate::domain::ecdsa::keccak256;
use crate::domain::entities::{EvmAlias, ExpandedSignaturePair, Message, SignatureVerification};
use crate::domain::errors::ResolveError;
use crate::domain::handle::{SharedHandle, VerificationHandle};
use crate::domain::key::{Key, KeyAlgorithm};
use crate::ports::outbound::{CryptoEngine, CryptoHandle};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Handle for a single primitive key backed by an engine request.
pub struct PrimitiveVerificationHandle {
    key: Key,
    evm_alias: Option<EvmAlias>,
    inner: Box<dyn CryptoHandle>,
}

impl PrimitiveVerificationHandle {
    pub fn new(key: Key, evm_alias: Option<EvmAlias>, inner: Box<dyn CryptoHandle>) -> Self {
        Self {
            key,
            evm_alias,
            inner,
        }
    }
}

impl VerificationHandle for PrimitiveVerificationHandle {
    fn key(&self) -> &Key {
        &self.key
    }

    fn evm_alias(&self) -> Option<&EvmAlias> {
        self.evm_alias.as_ref()
    }

    fn resolve(&self, timeout: Duration) -> Result<SignatureVerification, ResolveError> {
        let valid = self.inner.wait(timeout)?;
        Ok(SignatureVerification::new(self.key.clone(), self.evm_alias, valid))
    }

    fn cancel(&self) -> bool {
        self.inner.cancel()
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }
}

/// Output of a dispatch: primitive key to handle, plus the request count.
#[derive(Default)]
pub struct DispatchedVerifications {
    handles: BTreeMap<Key, SharedHandle>,
    dispatched: usize,
}

impl DispatchedVerifications {
    pub fn new(handles: BTreeMap<Key, SharedHandle>) -> Self {
        let dispatched = handles.len();
        Self {
            handles,
            dispatched,
        }
    }

    pub fn handles(&self) -> &BTreeMap<Key, SharedHandle> {
        &self.handles
    }

    pub fn get(&self, key: &Key) -> Option<&SharedHandle> {
        self.handles.get(key)
    }

    /// Number of engine requests issued.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn into_handles(self) -> BTreeMap<Key, SharedHandle> {
        self.handles
    }
}

/// Issues engine requests for expanded signature pairs.
pub struct VerificationDispatcher<E: CryptoEngine> {
    engine: Arc<E>,
}

impl<E: CryptoEngine> VerificationDispatcher<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// Dispatch every expanded pair against `message`.
    ///
    /// A key that appears in more than one expanded pair is dispatched once,
    /// for the first pair in set order.
    pub fn dispatch(
        &self,
        message: &Message,
        expanded: &BTreeSet<ExpandedSignaturePair>,
    ) -> DispatchedVerifications {
        let mut handles: BTreeMap<Key, SharedHandle> = BTreeMap::new();
        let mut dispatched = 0usize;
        for pair in expanded {
            if handles.contains_key(&pair.key) {
                trace!("[qc-10] Key already dispatched, skipping duplicate pair");
                continue;
            }
            let payload = signed_payload(message, pair.algorithm());
            let inner = self.engine.verify_async(
                payload,
                pair.signature().to_vec(),
                pair.full_key_bytes.clone(),
                pair.algorithm(),
            );
            dispatched += 1;
            handles.insert(
                pair.key.clone(),
                Arc::new(PrimitiveVerificationHandle::new(
                    pair.key.clone(),
                    pair.evm_alias,
                    inner,
                )),
            );
        }
        debug!("[qc-10] Dispatched {} signature verifications", dispatched);
        DispatchedVerifications {
            handles,
            dispatched,
        }
    }
}

/// Bytes the engine checks the signature against.
///
/// secp256k1 signatures cover the keccak256 hash of the message; every other
/// algorithm signs the message bytes as given.
fn signed_payload(message: &Message, algorithm: KeyAlgorithm) -> Vec<u8> {
    match (message, algorithm) {
        (Message::Raw(bytes), KeyAlgorithm::EcdsaSecp256k1) => keccak256(bytes).to_vec(),
        (Message::Raw(bytes), _) => bytes.clone(),
        (Message::Keccak256Hash(hash), _) => hash.to_vec(),
    }
}
