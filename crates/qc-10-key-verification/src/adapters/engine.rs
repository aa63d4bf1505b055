//! # Rayon Crypto Engine
//!
//! Reference implementation of the [`CryptoEngine`] port. Verification runs on
//! a rayon pool; callers get a [`PendingVerification`] they can wait on with a
//! timeout, cancel, or poll.
//!
//! ## Supported algorithms
//!
//! - **Ed25519**: strict verification (ed25519-dalek) over the payload bytes
//! - **secp256k1**: prehash verification (k256) of a 32-byte payload; the
//!   signature is `r || s` with an optional trailing recovery byte, and high S
//!   values are rejected (EIP-2)
//! - ECDSA P-384 and RSA-3072 always verify as `false`
//!
//! A check that panics on a worker resolves as `ResolveError::Engine`.

use crate::domain::errors::ResolveError;
use crate::domain::handle::deadline_after;
use crate::domain::key::{KeyAlgorithm, ECDSA_SECP256K1_COMPRESSED_LEN, ED25519_KEY_LEN};
use crate::ports::outbound::{CryptoEngine, CryptoHandle};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, UnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

// =============================================================================
// PENDING VERIFICATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotState {
    Queued,
    Running,
    Complete(bool),
    Failed(String),
    Cancelled,
}

impl SlotState {
    fn is_final(&self) -> bool {
        !matches!(self, SlotState::Queued | SlotState::Running)
    }
}

#[derive(Debug)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

/// Result slot shared between an engine worker and its waiters.
#[derive(Debug, Clone)]
pub struct PendingVerification {
    slot: Arc<Slot>,
}

impl Default for PendingVerification {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingVerification {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                state: Mutex::new(SlotState::Queued),
                ready: Condvar::new(),
            }),
        }
    }

    /// Claim the slot for a worker. `false` if it was cancelled while queued.
    pub fn start(&self) -> bool {
        let mut state = self.slot.state.lock();
        if *state != SlotState::Queued {
            return false;
        }
        *state = SlotState::Running;
        true
    }

    /// Publish the answer. Ignored once the slot is final.
    pub fn complete(&self, valid: bool) {
        self.finish(SlotState::Complete(valid));
    }

    /// Publish an engine failure. Ignored once the slot is final.
    pub fn fail(&self, reason: impl Into<String>) {
        self.finish(SlotState::Failed(reason.into()));
    }

    fn finish(&self, outcome: SlotState) {
        let mut state = self.slot.state.lock();
        if state.is_final() {
            return;
        }
        *state = outcome;
        self.slot.ready.notify_all();
    }
}

impl CryptoHandle for PendingVerification {
    fn wait(&self, timeout: Duration) -> Result<bool, ResolveError> {
        let deadline = deadline_after(timeout);
        let mut state = self.slot.state.lock();
        loop {
            match &*state {
                SlotState::Complete(valid) => return Ok(*valid),
                SlotState::Failed(reason) => return Err(ResolveError::Engine(reason.clone())),
                SlotState::Cancelled => return Err(ResolveError::Cancelled),
                SlotState::Queued | SlotState::Running => {}
            }
            match deadline {
                Some(deadline) => {
                    let waited = self.slot.ready.wait_until(&mut state, deadline);
                    if waited.timed_out() && !state.is_final() {
                        return Err(ResolveError::Timeout { waited: timeout });
                    }
                }
                None => self.slot.ready.wait(&mut state),
            }
        }
    }

    fn cancel(&self) -> bool {
        let mut state = self.slot.state.lock();
        match *state {
            SlotState::Queued | SlotState::Running => {
                *state = SlotState::Cancelled;
                self.slot.ready.notify_all();
                true
            }
            SlotState::Cancelled => true,
            SlotState::Complete(_) | SlotState::Failed(_) => false,
        }
    }

    fn is_done(&self) -> bool {
        self.slot.state.lock().is_final()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Crypto engine backed by a rayon thread pool.
#[derive(Debug, Clone, Default)]
pub struct RayonCryptoEngine {
    /// Dedicated pool; the global rayon pool when `None`
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl RayonCryptoEngine {
    /// Engine running on the global rayon pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Engine running on a dedicated pool.
    pub fn with_pool(pool: Arc<rayon::ThreadPool>) -> Self {
        Self { pool: Some(pool) }
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }
}

impl CryptoEngine for RayonCryptoEngine {
    fn verify_async(
        &self,
        payload: Vec<u8>,
        signature: Vec<u8>,
        public_key: Vec<u8>,
        algorithm: KeyAlgorithm,
    ) -> Box<dyn CryptoHandle> {
        let pending = PendingVerification::new();
        let worker = pending.clone();
        self.spawn(move || {
            run_verification(&worker, || {
                verify_signature(&payload, &signature, &public_key, algorithm)
            });
        });
        Box::new(pending)
    }
}

/// Run one check on a worker and publish its outcome into `worker`.
///
/// A panicking check fails the slot instead of unwinding into the pool.
fn run_verification<F>(worker: &PendingVerification, check: F)
where
    F: FnOnce() -> bool + UnwindSafe,
{
    if !worker.start() {
        return;
    }
    match panic::catch_unwind(check) {
        Ok(valid) => worker.complete(valid),
        Err(cause) => {
            let reason = panic_reason(cause.as_ref());
            error!("[qc-10] Signature check panicked: {}", reason);
            worker.fail(format!("verification panicked: {reason}"));
        }
    }
}

fn panic_reason(cause: &(dyn Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Synchronous signature check used by the engine workers.
pub fn verify_signature(
    payload: &[u8],
    signature: &[u8],
    public_key: &[u8],
    algorithm: KeyAlgorithm,
) -> bool {
    match algorithm {
        KeyAlgorithm::Ed25519 => verify_ed25519(payload, signature, public_key),
        KeyAlgorithm::EcdsaSecp256k1 => verify_secp256k1(payload, signature, public_key),
        KeyAlgorithm::Ecdsa384 | KeyAlgorithm::Rsa3072 => {
            debug!("[qc-10] No verifier for {:?}", algorithm);
            false
        }
    }
}

fn verify_ed25519(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; ED25519_KEY_LEN]>::try_from(public_key) else {
        return false;
    };
    let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
        return false;
    };
    key.verify_strict(message, &signature).is_ok()
}

fn verify_secp256k1(prehash: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    if prehash.len() != 32 || public_key.len() != ECDSA_SECP256K1_COMPRESSED_LEN {
        return false;
    }
    let rs = match signature.len() {
        64 => signature,
        65 => &signature[..64],
        _ => return false,
    };
    let Ok(key) = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = k256::ecdsa::Signature::from_slice(rs) else {
        return false;
    };
    // normalize_s() yields a value only for high S
    if signature.normalize_s().is_some() {
        return false;
    }
    key.verify_prehash(prehash, &signature).is_ok()
}
