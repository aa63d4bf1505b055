//! # Primitive Signature Collector
//!
//! Selects, for every primitive key reachable through a policy key, the
//! envelope signature pair that claims to authorize it.
//!
//! For threshold keys the selection keeps the pairs of **every** satisfied
//! member, not just the first `threshold` of them. If any subset of the
//! attached signatures can meet the threshold, all candidates must be
//! verified, because some of them may turn out to be cryptographically invalid.

use super::entities::SignaturePair;
use super::key::Key;
use super::policy::MemberPolicy;

/// Recursive signature selection over a fixed set of envelope pairs.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveSignatureCollector<'a> {
    pairs: &'a [SignaturePair],
}

impl<'a> PrimitiveSignatureCollector<'a> {
    pub fn new(pairs: &'a [SignaturePair]) -> Self {
        Self { pairs }
    }

    /// Pairs used to authorize `key`, in insertion order.
    ///
    /// `None` means no selection can satisfy the key. A returned selection is
    /// never empty.
    pub fn collect(&self, key: &Key) -> Option<Vec<SignaturePair>> {
        match key {
            Key::Primitive { algorithm, bytes } => self
                .pairs
                .iter()
                .find(|pair| pair.matches(*algorithm, bytes))
                .map(|pair| vec![pair.clone()]),
            Key::ContractId(_) | Key::DelegatableContractId(_) | Key::Unset => None,
            Key::KeyList(_) | Key::Threshold { .. } => {
                let (policy, members) = MemberPolicy::of(key)?;
                let selections = policy.select(members, |member| self.collect(member))?;
                Some(union(selections))
            }
        }
    }
}

/// Concatenate selections, dropping pairs already present.
fn union(selections: Vec<Vec<SignaturePair>>) -> Vec<SignaturePair> {
    let mut out: Vec<SignaturePair> = Vec::new();
    for pair in selections.into_iter().flatten() {
        if !out.contains(&pair) {
            out.push(pair);
        }
    }
    out
}
