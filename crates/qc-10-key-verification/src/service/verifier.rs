//! # Default Key Verifier
//!
//! Resolves keys against the handles dispatched for one transaction.
//!
//! Every top-level call is bounded by the configured timeout, shared
//! cooperatively across nested resolution. Anomalies never escape: a timeout
//! degrades to a failed verdict with a warning (peers that finished in time may
//! disagree, which risks an ISS), an engine error or cancellation degrades to a
//! failed verdict with an error log.

use super::dispatcher::DispatchedVerifications;
use crate::config::VerificationConfig;
use crate::domain::entities::{EvmAlias, SignatureVerification, EVM_ALIAS_LEN};
use crate::domain::errors::{ResolveError, VerificationError};
use crate::domain::handle::{
    deadline_after, remaining_until, CompositeVerificationHandle, ResolvedHandle, SharedHandle,
};
use crate::domain::key::Key;
use crate::domain::policy::{compose_verdict, MemberPolicy};
use crate::ports::inbound::{KeyVerifier, VerificationAssistant};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

/// Key verifier over asynchronously dispatched signature checks.
pub struct DefaultKeyVerifier {
    timeout: Duration,
    handles: BTreeMap<Key, SharedHandle>,
    num_signatures_verified: usize,
    /// Definitive primitive verdicts; anomalies are never cached
    resolved: Mutex<BTreeMap<Key, SignatureVerification>>,
}

impl DefaultKeyVerifier {
    pub fn new(config: &VerificationConfig, dispatched: DispatchedVerifications) -> Self {
        let num_signatures_verified = dispatched.dispatched();
        Self {
            timeout: config.timeout(),
            handles: dispatched.into_handles(),
            num_signatures_verified,
            resolved: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handle deciding `key`, composed lazily over the primitive handles.
    ///
    /// Keys that cannot be satisfied cryptographically (no dispatched
    /// signature, empty compound keys, contract ids, unset) get an
    /// already-failed handle.
    pub fn handle_for(&self, key: &Key) -> SharedHandle {
        match key {
            Key::Primitive { .. } => self
                .handles
                .get(key)
                .cloned()
                .unwrap_or_else(|| failed_handle(key)),
            Key::KeyList(_) | Key::Threshold { .. } => {
                let Some((policy, members)) = MemberPolicy::of(key) else {
                    return failed_handle(key);
                };
                let children: Vec<SharedHandle> =
                    members.iter().map(|member| self.handle_for(member)).collect();
                let allowed_failures = policy.allowed_failures(members.len());
                match CompositeVerificationHandle::new(key.clone(), None, children, allowed_failures)
                {
                    Ok(composite) => Arc::new(composite),
                    Err(VerificationError::EmptyChildHandles) => failed_handle(key),
                    Err(err) => {
                        error!("[qc-10] Cannot compose handle: {}", err);
                        failed_handle(key)
                    }
                }
            }
            Key::ContractId(_) | Key::DelegatableContractId(_) | Key::Unset => failed_handle(key),
        }
    }

    /// Cancel every dispatched check that has not finished yet.
    ///
    /// Returns `true` if every outstanding check was cancelled.
    pub fn cancel_all(&self) -> bool {
        self.handles
            .values()
            .filter(|handle| !handle.is_done())
            .fold(true, |all, handle| handle.cancel() && all)
    }

    /// Verdict of a primitive key, waiting no later than `deadline`.
    fn primitive_verification(&self, key: &Key, deadline: Option<Instant>) -> SignatureVerification {
        if let Some(cached) = self.resolved.lock().get(key) {
            return cached.clone();
        }
        let Some(handle) = self.handles.get(key) else {
            return SignatureVerification::failed(key.clone(), None);
        };
        match handle.resolve(remaining_until(deadline, self.timeout)) {
            Ok(verification) => {
                self.resolved.lock().insert(key.clone(), verification.clone());
                verification
            }
            Err(err) => degrade(handle.key(), handle.evm_alias().copied(), err),
        }
    }
}

fn failed_handle(key: &Key) -> SharedHandle {
    Arc::new(ResolvedHandle::failed(key.clone()))
}

/// Turn a resolution anomaly into a failed verdict.
fn degrade(key: &Key, evm_alias: Option<EvmAlias>, err: ResolveError) -> SignatureVerification {
    match &err {
        ResolveError::Timeout { waited } => warn!(
            "[qc-10] Signature verification timed out after {:?}; treating key as unauthorized",
            waited
        ),
        ResolveError::Cancelled | ResolveError::Engine(_) => {
            error!("[qc-10] Signature verification failed to resolve: {}", err)
        }
    }
    SignatureVerification::failed(key.clone(), evm_alias)
}

impl KeyVerifier for DefaultKeyVerifier {
    fn verification_for(&self, key: &Key) -> SignatureVerification {
        if key.is_primitive() {
            return self.primitive_verification(key, deadline_after(self.timeout));
        }
        let handle = self.handle_for(key);
        match handle.resolve(self.timeout) {
            Ok(verification) => verification,
            Err(err) => degrade(key, handle.evm_alias().copied(), err),
        }
    }

    fn verification_for_with_assistant(
        &self,
        key: &Key,
        assistant: &VerificationAssistant<'_>,
    ) -> SignatureVerification {
        let deadline = deadline_after(self.timeout);
        compose_verdict(key, &mut |leaf: &Key| {
            let intermediate = if leaf.is_primitive() {
                self.primitive_verification(leaf, deadline)
            } else {
                SignatureVerification::failed(leaf.clone(), None)
            };
            let passed = assistant(leaf, &intermediate);
            SignatureVerification::new(leaf.clone(), intermediate.evm_alias().copied(), passed)
        })
    }

    fn verification_for_alias(&self, evm_alias: &[u8]) -> SignatureVerification {
        if evm_alias.len() != EVM_ALIAS_LEN {
            debug!(
                "[qc-10] {}",
                VerificationError::InvalidAliasLength {
                    actual: evm_alias.len()
                }
            );
            return SignatureVerification::failed(Key::Unset, None);
        }
        let found = self.handles.iter().find(|(_, handle)| {
            handle
                .evm_alias()
                .is_some_and(|stored| bool::from(stored[..].ct_eq(evm_alias)))
        });
        match found {
            Some((key, _)) => self.primitive_verification(key, deadline_after(self.timeout)),
            None => {
                let mut alias = [0u8; EVM_ALIAS_LEN];
                alias.copy_from_slice(evm_alias);
                SignatureVerification::failed(Key::Unset, Some(alias))
            }
        }
    }

    fn num_signatures_verified(&self) -> usize {
        self.num_signatures_verified
    }

    fn authorizing_simple_keys(&self) -> BTreeSet<Key> {
        let deadline = deadline_after(self.timeout);
        self.handles
            .keys()
            .filter(|key| self.primitive_verification(key, deadline).has_passed())
            .cloned()
            .collect()
    }
}
