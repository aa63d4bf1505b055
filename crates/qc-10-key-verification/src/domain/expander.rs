//! # Signature Expander
//!
//! Turns envelope signature pairs into [`ExpandedSignaturePair`]s bound to a
//! complete public key.
//!
//! Two modes:
//! - [`SignatureExpander::expand_all`] scans every pair and keeps those whose
//!   prefix is already a complete key (used to discover hollow-account aliases).
//! - [`SignatureExpander::expand_for_key`] walks a policy key and matches each
//!   primitive member against the pairs by prefix.
//!
//! The caller guarantees that no two pairs share a prefix and that no prefix is
//! a prefix of another. Output goes into a set, so repeated expansion is idempotent.

use super::ecdsa::{decompress, evm_alias_from_uncompressed};
use super::entities::{ExpandedSignaturePair, SignaturePair};
use super::key::{Key, KeyAlgorithm};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Stateless signature expander.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureExpander;

impl SignatureExpander {
    pub fn new() -> Self {
        Self
    }

    /// Expand every pair whose prefix is a complete public key.
    pub fn expand_all(&self, pairs: &[SignaturePair], out: &mut BTreeSet<ExpandedSignaturePair>) {
        for pair in pairs.iter().filter(|pair| pair.has_full_prefix()) {
            if let Some(expanded) = expand(pair.algorithm, &pair.prefix, pair) {
                out.insert(expanded);
            }
        }
    }

    /// Expand the pairs matching the primitive keys reachable from `key`.
    pub fn expand_for_key(
        &self,
        pairs: &[SignaturePair],
        key: &Key,
        out: &mut BTreeSet<ExpandedSignaturePair>,
    ) {
        match key {
            Key::Primitive { algorithm, bytes } => {
                let Some(pair) = pairs.iter().find(|pair| pair.matches(*algorithm, bytes)) else {
                    trace!("[qc-10] No signature pair for {:?} key", algorithm);
                    return;
                };
                if let Some(expanded) = expand(*algorithm, bytes, pair) {
                    out.insert(expanded);
                }
            }
            Key::KeyList(members) | Key::Threshold { members, .. } => {
                for member in members {
                    self.expand_for_key(pairs, member, out);
                }
            }
            Key::ContractId(_) | Key::DelegatableContractId(_) | Key::Unset => {}
        }
    }
}

/// Bind `pair` to the complete key `full_key`.
///
/// Returns `None` when the key has the wrong length for its algorithm, is not
/// a valid secp256k1 point, or uses an algorithm that is never expanded.
fn expand(
    algorithm: KeyAlgorithm,
    full_key: &[u8],
    pair: &SignaturePair,
) -> Option<ExpandedSignaturePair> {
    if algorithm.full_key_len() != Some(full_key.len()) {
        return None;
    }
    let evm_alias = match algorithm {
        KeyAlgorithm::Ed25519 => None,
        KeyAlgorithm::EcdsaSecp256k1 => {
            let Some(uncompressed) = decompress(full_key) else {
                debug!("[qc-10] Skipping undecompressible secp256k1 key");
                return None;
            };
            Some(evm_alias_from_uncompressed(&uncompressed))
        }
        KeyAlgorithm::Ecdsa384 | KeyAlgorithm::Rsa3072 => return None,
    };
    Some(ExpandedSignaturePair {
        key: Key::Primitive {
            algorithm,
            bytes: full_key.to_vec(),
        },
        full_key_bytes: full_key.to_vec(),
        evm_alias,
        source_pair: pair.clone(),
    })
}
