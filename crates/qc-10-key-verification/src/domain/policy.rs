//! # Member Policy
//!
//! List/threshold combinator shared by signature selection, verdict
//! composition and composite handle construction.
//!
//! - `KeyList`: every member must be satisfied; an empty list never is.
//! - `Threshold`: at least `max(1, min(threshold, members))` members must be
//!   satisfied. Every member is evaluated and every satisfied outcome is kept.

use super::entities::SignatureVerification;
use super::key::Key;

/// Effective threshold of a threshold key.
pub fn clamped_threshold(threshold: u32, member_count: usize) -> usize {
    usize::try_from(threshold)
        .unwrap_or(usize::MAX)
        .min(member_count)
        .max(1)
}

/// How many members of a compound key must be satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberPolicy {
    /// All members (key lists).
    All,
    /// At least `required` members (threshold keys, already clamped).
    AtLeast { required: usize },
}

impl MemberPolicy {
    /// Policy and members of a compound key; `None` for every other key kind.
    pub fn of(key: &Key) -> Option<(MemberPolicy, &[Key])> {
        match key {
            Key::KeyList(members) => Some((MemberPolicy::All, members)),
            Key::Threshold { threshold, members } => Some((
                MemberPolicy::AtLeast {
                    required: clamped_threshold(*threshold, members.len()),
                },
                members,
            )),
            Key::Primitive { .. }
            | Key::ContractId(_)
            | Key::DelegatableContractId(_)
            | Key::Unset => None,
        }
    }

    /// Number of members that may fail while the key is still satisfied.
    pub fn allowed_failures(&self, member_count: usize) -> usize {
        match self {
            MemberPolicy::All => 0,
            MemberPolicy::AtLeast { required } => member_count.saturating_sub(*required),
        }
    }

    /// Evaluate members and keep the outcomes of the satisfied ones.
    ///
    /// `evaluate` returns `None` for an unsatisfied member. The result is
    /// `None` when the policy is not met. Key lists stop at the first
    /// unsatisfied member; thresholds always evaluate every member.
    pub fn select<'k, T, F>(&self, members: &'k [Key], mut evaluate: F) -> Option<Vec<T>>
    where
        F: FnMut(&'k Key) -> Option<T>,
    {
        match self {
            MemberPolicy::All => {
                if members.is_empty() {
                    return None;
                }
                members.iter().map(evaluate).collect()
            }
            MemberPolicy::AtLeast { required } => {
                let satisfied: Vec<T> = members.iter().filter_map(&mut evaluate).collect();
                (satisfied.len() >= *required).then_some(satisfied)
            }
        }
    }
}

/// Fold a key into a single verdict.
///
/// `leaf` decides primitive, `ContractId` and `DelegatableContractId` keys.
/// `Unset` always fails. Compound keys combine their members' verdicts
/// under [`MemberPolicy`].
pub fn compose_verdict<F>(key: &Key, leaf: &mut F) -> SignatureVerification
where
    F: FnMut(&Key) -> SignatureVerification,
{
    match key {
        Key::Primitive { .. } | Key::ContractId(_) | Key::DelegatableContractId(_) => leaf(key),
        Key::Unset => SignatureVerification::failed(key.clone(), None),
        Key::KeyList(_) | Key::Threshold { .. } => {
            let passed = MemberPolicy::of(key)
                .and_then(|(policy, members)| {
                    policy.select(members, |member| {
                        compose_verdict(member, &mut *leaf).has_passed().then_some(())
                    })
                })
                .is_some();
            SignatureVerification::new(key.clone(), None, passed)
        }
    }
}
