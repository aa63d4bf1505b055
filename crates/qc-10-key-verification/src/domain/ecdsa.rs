//! # secp256k1 Key Helpers
//!
//! Decompression of compressed public keys and EVM alias derivation.
//! Uses the k256 crate for curve operations and sha3 for keccak256.

use super::entities::{EvmAlias, EVM_ALIAS_LEN, MESSAGE_HASH_LEN};
use super::key::ECDSA_SECP256K1_COMPRESSED_LEN;
use k256::ecdsa::VerifyingKey;
use sha3::{Digest, Keccak256};

/// Length of an uncompressed secp256k1 point (0x04 || x || y).
pub const UNCOMPRESSED_KEY_LEN: usize = 65;

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> [u8; MESSAGE_HASH_LEN] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; MESSAGE_HASH_LEN];
    hash.copy_from_slice(&result);
    hash
}

/// Decompress a 33-byte compressed secp256k1 key.
///
/// Returns `None` for anything that is not a valid compressed curve point.
/// Malformed prefixes are routine in untrusted envelopes, so this is not an error.
pub fn decompress(compressed: &[u8]) -> Option<[u8; UNCOMPRESSED_KEY_LEN]> {
    if compressed.len() != ECDSA_SECP256K1_COMPRESSED_LEN {
        return None;
    }
    let key = VerifyingKey::from_sec1_bytes(compressed).ok()?;
    let point = key.to_encoded_point(false);
    point.as_bytes().try_into().ok()
}

/// Derive the EVM alias from an uncompressed public key.
///
/// keccak256 over x || y (without the 0x04 tag), last 20 bytes.
pub fn evm_alias_from_uncompressed(uncompressed: &[u8; UNCOMPRESSED_KEY_LEN]) -> EvmAlias {
    let hash = keccak256(&uncompressed[1..]);
    let mut alias = [0u8; EVM_ALIAS_LEN];
    alias.copy_from_slice(&hash[MESSAGE_HASH_LEN - EVM_ALIAS_LEN..]);
    alias
}

/// Derive the EVM alias directly from a compressed key.
pub fn evm_alias_from_compressed(compressed: &[u8]) -> Option<EvmAlias> {
    decompress(compressed).map(|uncompressed| evm_alias_from_uncompressed(&uncompressed))
}
