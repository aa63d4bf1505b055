//! Fuzz target for signature selection and expansion.
//!
//! Envelope prefixes are untrusted input; matching and secp256k1
//! decompression must never panic on them.
//!
//! ## Running
//!
//! ```bash
//! cd crates/qc-10-key-verification
//! cargo +nightly fuzz run fuzz_signature_expansion
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use qc_10_key_verification::{
    Key, KeyAlgorithm, PrimitiveSignatureCollector, SignatureExpander, SignaturePair,
};
use std::collections::BTreeSet;

/// Fuzz input: a threshold over arbitrary primitive keys plus arbitrary pairs.
#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    threshold: u32,
    keys: Vec<(bool, Vec<u8>)>,
    pairs: Vec<(bool, Vec<u8>, Vec<u8>)>,
}

fn algorithm(secp256k1: bool) -> KeyAlgorithm {
    if secp256k1 {
        KeyAlgorithm::EcdsaSecp256k1
    } else {
        KeyAlgorithm::Ed25519
    }
}

fuzz_target!(|input: FuzzInput| {
    let members: Vec<Key> = input
        .keys
        .into_iter()
        .map(|(secp256k1, bytes)| Key::Primitive {
            algorithm: algorithm(secp256k1),
            bytes,
        })
        .collect();
    let key = Key::threshold(input.threshold, members);
    let pairs: Vec<SignaturePair> = input
        .pairs
        .into_iter()
        .map(|(secp256k1, prefix, signature)| {
            SignaturePair::new(algorithm(secp256k1), prefix, signature)
        })
        .collect();

    // 1. A selection is never empty
    let collector = PrimitiveSignatureCollector::new(&pairs);
    if let Some(selected) = collector.collect(&key) {
        assert!(!selected.is_empty());
    }

    // 2. Expansion never panics and is idempotent
    let expander = SignatureExpander::new();
    let mut expanded = BTreeSet::new();
    expander.expand_all(&pairs, &mut expanded);
    expander.expand_for_key(&pairs, &key, &mut expanded);
    let size = expanded.len();
    expander.expand_all(&pairs, &mut expanded);
    assert_eq!(expanded.len(), size);

    // 3. secp256k1 expansions always carry an alias
    for pair in &expanded {
        assert_eq!(
            pair.evm_alias.is_some(),
            pair.algorithm() == KeyAlgorithm::EcdsaSecp256k1
        );
    }
});
