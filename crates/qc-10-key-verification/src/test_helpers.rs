//! Test fixtures: key generation, signing, stub handles and a scripted engine.

use crate::adapters::engine::PendingVerification;
use crate::domain::entities::{EvmAlias, SignatureVerification};
use crate::domain::errors::ResolveError;
use crate::domain::handle::VerificationHandle;
use crate::domain::key::{Key, KeyAlgorithm};
use crate::ports::outbound::{CryptoEngine, CryptoHandle};
use ed25519_dalek::Signer;
use k256::ecdsa::{RecoveryId, SigningKey, VerifyingKey};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// secp256k1 curve order n
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Install a test-writer subscriber so `[qc-10]` logs show up in failing tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// =============================================================================
// Keys and signatures
// =============================================================================

pub fn ed_key(byte: u8) -> Key {
    Key::ed25519(vec![byte; 32])
}

/// Generate a new secp256k1 keypair.
pub fn generate_ecdsa_keypair() -> (SigningKey, VerifyingKey) {
    let signing_key = SigningKey::random(&mut rand::thread_rng());
    let verifying_key = *signing_key.verifying_key();
    (signing_key, verifying_key)
}

pub fn compressed_key(verifying_key: &VerifyingKey) -> Vec<u8> {
    verifying_key.to_encoded_point(true).as_bytes().to_vec()
}

/// Sign a prehash; returns `r || s || v` with low S.
pub fn sign_ecdsa(signing_key: &SigningKey, prehash: &[u8; 32]) -> Vec<u8> {
    let (mut signature, mut recid) = signing_key
        .sign_prehash_recoverable(prehash)
        .expect("signing failed");
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
    }
    let mut out = signature.to_bytes().to_vec();
    out.push(recid.to_byte());
    out
}

/// s' = n - s
pub fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;
    for i in (0..32).rev() {
        let diff = (SECP256K1_ORDER[i] as i32) - (s[i] as i32) - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}

pub fn generate_ed25519_keypair() -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::from_bytes(&rand::random::<[u8; 32]>())
}

pub fn sign_ed25519(signing_key: &ed25519_dalek::SigningKey, message: &[u8]) -> Vec<u8> {
    signing_key.sign(message).to_bytes().to_vec()
}

// =============================================================================
// Stub handle
// =============================================================================

/// Verification handle driven by the test.
pub struct StubHandle {
    key: Key,
    evm_alias: Option<EvmAlias>,
    pending: PendingVerification,
    cancellable: bool,
    resolve_calls: AtomicUsize,
}

impl StubHandle {
    /// Never completes unless the test calls `complete`.
    pub fn pending(key: Key) -> Self {
        Self {
            key,
            evm_alias: None,
            pending: PendingVerification::new(),
            cancellable: true,
            resolve_calls: AtomicUsize::new(0),
        }
    }

    pub fn erroring(key: Key, reason: &str) -> Self {
        let stub = Self::pending(key);
        stub.pending.fail(reason);
        stub
    }

    /// Ignores cancellation requests.
    pub fn uncancellable(key: Key) -> Self {
        Self {
            cancellable: false,
            ..Self::pending(key)
        }
    }

    pub fn complete(&self, valid: bool) {
        self.pending.complete(valid);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

impl VerificationHandle for StubHandle {
    fn key(&self) -> &Key {
        &self.key
    }

    fn evm_alias(&self) -> Option<&EvmAlias> {
        self.evm_alias.as_ref()
    }

    fn resolve(&self, timeout: Duration) -> Result<SignatureVerification, ResolveError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let valid = self.pending.wait(timeout)?;
        Ok(SignatureVerification::new(self.key.clone(), self.evm_alias, valid))
    }

    fn cancel(&self) -> bool {
        self.cancellable && self.pending.cancel()
    }

    fn is_done(&self) -> bool {
        self.pending.is_done()
    }
}

// =============================================================================
// Scripted engine
// =============================================================================

/// A request as seen by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineRequest {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
    pub algorithm: KeyAlgorithm,
}

type Outcome = Box<dyn Fn(&EngineRequest) -> Option<bool> + Send + Sync>;

/// Engine whose answers are decided by the test. `None` leaves a request pending.
pub struct ScriptedEngine {
    requests: Mutex<Vec<EngineRequest>>,
    outcome: Outcome,
}

impl ScriptedEngine {
    pub fn new(outcome: impl Fn(&EngineRequest) -> Option<bool> + Send + Sync + 'static) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            outcome: Box::new(outcome),
        }
    }

    pub fn accepting_all() -> Self {
        Self::new(|_| Some(true))
    }

    /// Accepts only requests signed by one of `keys`.
    pub fn accepting_keys(keys: Vec<Vec<u8>>) -> Self {
        Self::new(move |req| Some(keys.contains(&req.public_key)))
    }

    pub fn never_completing() -> Self {
        Self::new(|_| None)
    }

    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().clone()
    }
}

impl CryptoEngine for ScriptedEngine {
    fn verify_async(
        &self,
        payload: Vec<u8>,
        signature: Vec<u8>,
        public_key: Vec<u8>,
        algorithm: KeyAlgorithm,
    ) -> Box<dyn CryptoHandle> {
        let request = EngineRequest {
            payload,
            signature,
            public_key,
            algorithm,
        };
        let pending = PendingVerification::new();
        if let Some(valid) = (self.outcome)(&request) {
            pending.complete(valid);
        }
        self.requests.lock().push(request);
        Box::new(pending)
    }
}
