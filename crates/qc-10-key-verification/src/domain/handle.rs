//! # Verification Handles
//!
//! Asynchronous verification results as an explicit capability
//! (`resolve` / `cancel` / `is_done`), independent of any async runtime.
//!
//! [`CompositeVerificationHandle`] aggregates child handles under list or
//! threshold semantics. Resolution waits on children in declared order and
//! bounds the *total* wall time by a single deadline.

use super::entities::{EvmAlias, SignatureVerification};
use super::errors::{ResolveError, VerificationError};
use super::key::Key;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An asynchronous verification result for one key.
///
/// Implementations must be safe to `cancel` or poll `is_done` from a thread
/// other than the one blocked in `resolve`.
pub trait VerificationHandle: Send + Sync {
    /// The key this handle decides.
    fn key(&self) -> &Key;

    /// EVM alias of the key, if known.
    fn evm_alias(&self) -> Option<&EvmAlias>;

    /// Block for at most `timeout` waiting for the verdict.
    fn resolve(&self, timeout: Duration) -> Result<SignatureVerification, ResolveError>;

    /// Best-effort cancellation. Returns `true` if the work was cancelled.
    fn cancel(&self) -> bool;

    /// Whether a result (or cancellation) is available without blocking.
    fn is_done(&self) -> bool;
}

/// Shared handle as stored in the dispatched key mapping.
pub type SharedHandle = Arc<dyn VerificationHandle>;

/// Deadline `timeout` from now, or `None` when it would overflow `Instant`.
pub fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Time left until `deadline`; an unbounded deadline leaves `fallback`.
pub fn remaining_until(deadline: Option<Instant>, fallback: Duration) -> Duration {
    deadline
        .map(|deadline| deadline.saturating_duration_since(Instant::now()))
        .unwrap_or(fallback)
}

// =============================================================================
// Resolved Handle
// =============================================================================

/// A handle whose verdict is already known.
///
/// Stands in for keys that have no dispatched signature, so that absent
/// keys fail exactly like cryptographically rejected ones.
#[derive(Debug, Clone)]
pub struct ResolvedHandle {
    verification: SignatureVerification,
}

impl ResolvedHandle {
    pub fn new(verification: SignatureVerification) -> Self {
        Self { verification }
    }

    pub fn failed(key: Key) -> Self {
        Self::new(SignatureVerification::failed(key, None))
    }
}

impl VerificationHandle for ResolvedHandle {
    fn key(&self) -> &Key {
        self.verification.key()
    }

    fn evm_alias(&self) -> Option<&EvmAlias> {
        self.verification.evm_alias()
    }

    fn resolve(&self, _timeout: Duration) -> Result<SignatureVerification, ResolveError> {
        Ok(self.verification.clone())
    }

    fn cancel(&self) -> bool {
        false
    }

    fn is_done(&self) -> bool {
        true
    }
}

// =============================================================================
// Composite Handle
// =============================================================================

/// Lifecycle of a composite handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum HandleState {
    Pending = 0,
    Resolved = 1,
    Cancelled = 2,
    TimedOut = 3,
}

impl HandleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => HandleState::Resolved,
            2 => HandleState::Cancelled,
            3 => HandleState::TimedOut,
            _ => HandleState::Pending,
        }
    }
}

/// Aggregates child handles: passes iff at most `allowed_failures` children fail.
///
/// `allowed_failures` is `members - clamped_threshold` for threshold keys and
/// `0` for key lists.
pub struct CompositeVerificationHandle {
    key: Key,
    evm_alias: Option<EvmAlias>,
    children: Vec<SharedHandle>,
    allowed_failures: usize,
    state: AtomicU8,
}

impl CompositeVerificationHandle {
    /// Create a composite over `children`.
    ///
    /// # Errors
    /// * `VerificationError::EmptyChildHandles` - `children` is empty
    pub fn new(
        key: Key,
        evm_alias: Option<EvmAlias>,
        children: Vec<SharedHandle>,
        allowed_failures: usize,
    ) -> Result<Self, VerificationError> {
        if children.is_empty() {
            return Err(VerificationError::EmptyChildHandles);
        }
        Ok(Self {
            key,
            evm_alias,
            children,
            allowed_failures,
            state: AtomicU8::new(HandleState::Pending as u8),
        })
    }

    pub fn allowed_failures(&self) -> usize {
        self.allowed_failures
    }

    pub fn children(&self) -> &[SharedHandle] {
        &self.children
    }

    pub fn state(&self) -> HandleState {
        HandleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Record a terminal state unless the handle was cancelled meanwhile.
    fn settle(&self, state: HandleState) {
        let _ = self.state.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            (current != HandleState::Cancelled as u8).then_some(state as u8)
        });
    }

    fn verdict(&self, passed: bool) -> SignatureVerification {
        SignatureVerification::new(self.key.clone(), self.evm_alias, passed)
    }
}

impl VerificationHandle for CompositeVerificationHandle {
    fn key(&self) -> &Key {
        &self.key
    }

    fn evm_alias(&self) -> Option<&EvmAlias> {
        self.evm_alias.as_ref()
    }

    fn resolve(&self, timeout: Duration) -> Result<SignatureVerification, ResolveError> {
        if self.state() == HandleState::Cancelled {
            return Err(ResolveError::Cancelled);
        }
        let deadline = deadline_after(timeout);
        let mut failures = 0usize;
        for child in &self.children {
            let verification = match child.resolve(remaining_until(deadline, timeout)) {
                Ok(verification) => verification,
                Err(err) => {
                    if err.is_timeout() {
                        self.settle(HandleState::TimedOut);
                        return Err(ResolveError::Timeout { waited: timeout });
                    }
                    return Err(err);
                }
            };
            if verification.has_failed() {
                failures += 1;
                if failures > self.allowed_failures {
                    self.settle(HandleState::Resolved);
                    return Ok(self.verdict(false));
                }
            }
        }
        self.settle(HandleState::Resolved);
        Ok(self.verdict(true))
    }

    fn cancel(&self) -> bool {
        self.state.store(HandleState::Cancelled as u8, Ordering::Release);
        self.children
            .iter()
            .filter(|child| !child.is_done())
            .fold(true, |all, child| child.cancel() && all)
    }

    fn is_done(&self) -> bool {
        self.state() == HandleState::Cancelled || self.children.iter().all(|child| child.is_done())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ed_key, StubHandle};
    use std::thread;

    fn resolved(byte: u8, passed: bool) -> SharedHandle {
        Arc::new(ResolvedHandle::new(SignatureVerification::new(
            ed_key(byte),
            None,
            passed,
        )))
    }

    fn composite(children: Vec<SharedHandle>, allowed_failures: usize) -> CompositeVerificationHandle {
        let key = Key::threshold(1, children.iter().map(|c| c.key().clone()).collect());
        CompositeVerificationHandle::new(key, None, children, allowed_failures).unwrap()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn test_empty_children_rejected() {
        let result = CompositeVerificationHandle::new(Key::list(vec![]), None, vec![], 0);
        assert!(matches!(result, Err(VerificationError::EmptyChildHandles)));
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn test_fails_iff_failures_exceed_allowance() {
        for n in 1..=4usize {
            for failing in 0..=n {
                for k in 0..=n {
                    let children = (0..n)
                        .map(|i| resolved(i as u8, i >= failing))
                        .collect();
                    let handle = composite(children, k);
                    let verdict = handle.resolve(Duration::from_secs(1)).unwrap();
                    assert_eq!(
                        verdict.has_passed(),
                        failing <= k,
                        "n={n} failing={failing} k={k}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_threshold_two_of_three_with_one_missing() {
        let handle = composite(vec![resolved(1, true), resolved(2, false), resolved(3, true)], 1);
        let verdict = handle.resolve(Duration::from_secs(1)).unwrap();
        assert!(verdict.has_passed());
        assert_eq!(handle.state(), HandleState::Resolved);
    }

    #[test]
    fn test_short_circuit_skips_remaining_children() {
        let never = Arc::new(StubHandle::pending(ed_key(9)));
        let handle = composite(vec![resolved(1, false), never.clone()], 0);
        // A pending child after the allowance is exceeded is never waited on.
        let verdict = handle.resolve(Duration::from_millis(10)).unwrap();
        assert!(verdict.has_failed());
        assert_eq!(never.resolve_calls(), 0);
    }

    #[test]
    fn test_child_timeout_propagates() {
        let handle = composite(
            vec![resolved(1, true), Arc::new(StubHandle::pending(ed_key(2)))],
            0,
        );
        let result = handle.resolve(Duration::from_millis(20));
        assert!(matches!(result, Err(ResolveError::Timeout { .. })));
        assert_eq!(handle.state(), HandleState::TimedOut);
    }

    #[test]
    fn test_child_engine_error_propagates() {
        let handle = composite(
            vec![Arc::new(StubHandle::erroring(ed_key(1), "pool shut down"))],
            3,
        );
        assert_eq!(
            handle.resolve(Duration::from_millis(20)),
            Err(ResolveError::Engine("pool shut down".into()))
        );
    }

    #[test]
    fn test_timeout_bounds_total_wall_time() {
        let children: Vec<SharedHandle> = (0..5)
            .map(|i| Arc::new(StubHandle::pending(ed_key(i))) as SharedHandle)
            .collect();
        let handle = composite(children, 5);
        let started = Instant::now();
        let _ = handle.resolve(Duration::from_millis(50));
        // One timeout, not five.
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn test_resolves_once_child_completes_on_other_thread() {
        let child = Arc::new(StubHandle::pending(ed_key(1)));
        let handle = composite(vec![child.clone()], 0);
        let completer = {
            let child = child.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                child.complete(true);
            })
        };
        let verdict = handle.resolve(Duration::from_secs(5)).unwrap();
        completer.join().unwrap();
        assert!(verdict.has_passed());
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    #[test]
    fn test_cancel_is_idempotent() {
        let pending = Arc::new(StubHandle::pending(ed_key(2)));
        let handle = composite(vec![resolved(1, true), pending.clone()], 0);
        assert!(!handle.is_done());

        assert!(handle.cancel());
        assert!(handle.is_done());
        assert!(pending.is_done());

        assert!(handle.cancel());
        assert!(handle.is_done());
        assert_eq!(handle.state(), HandleState::Cancelled);
    }

    #[test]
    fn test_cancel_reports_uncancellable_children() {
        let stubborn = Arc::new(StubHandle::uncancellable(ed_key(2)));
        let handle = composite(vec![stubborn], 0);
        assert!(!handle.cancel());
        // Still cancelled from the caller's point of view.
        assert!(handle.is_done());
        assert_eq!(
            handle.resolve(Duration::from_millis(1)),
            Err(ResolveError::Cancelled)
        );
    }

    #[test]
    fn test_is_done_when_all_children_done() {
        let handle = composite(vec![resolved(1, true), resolved(2, false)], 1);
        assert!(handle.is_done());
    }

    #[test]
    fn test_nested_composites() {
        let inner = composite(vec![resolved(1, true), resolved(2, true)], 0);
        let outer = composite(vec![Arc::new(inner), resolved(3, false)], 1);
        assert!(outer.resolve(Duration::from_secs(1)).unwrap().has_passed());
    }
}
