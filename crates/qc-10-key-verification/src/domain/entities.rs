//! # Domain Entities
//!
//! Signature pairs as they arrive in the transaction envelope, the expanded
//! form matched to a full public key, and the terminal verification verdict.

use super::errors::VerificationError;
use super::key::{Key, KeyAlgorithm};
use serde::{Deserialize, Serialize};

/// EVM-style address derived from a secp256k1 public key
/// (last 20 bytes of keccak256 of the uncompressed point).
pub type EvmAlias = [u8; 20];

/// Length of an EVM alias.
pub const EVM_ALIAS_LEN: usize = 20;

/// Length of a keccak256 message hash.
pub const MESSAGE_HASH_LEN: usize = 32;

// =============================================================================
// Signature Pairs
// =============================================================================

/// A signature together with a (possibly partial) prefix of the signer's key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignaturePair {
    /// Prefix of the public key; empty matches nothing
    pub prefix: Vec<u8>,
    /// Raw signature bytes
    pub signature: Vec<u8>,
    /// Algorithm of the signature
    pub algorithm: KeyAlgorithm,
}

impl SignaturePair {
    pub fn new(
        algorithm: KeyAlgorithm,
        prefix: impl Into<Vec<u8>>,
        signature: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            signature: signature.into(),
            algorithm,
        }
    }

    /// Whether this pair claims to be signed by the given primitive key.
    pub fn matches(&self, algorithm: KeyAlgorithm, key_bytes: &[u8]) -> bool {
        self.algorithm == algorithm && !self.prefix.is_empty() && key_bytes.starts_with(&self.prefix)
    }

    /// Whether the prefix has the length of a complete public key.
    pub fn has_full_prefix(&self) -> bool {
        self.algorithm.full_key_len() == Some(self.prefix.len())
    }
}

/// A signature pair matched to a complete primitive key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpandedSignaturePair {
    /// The primitive key the signature is for
    pub key: Key,
    /// Complete public key bytes
    pub full_key_bytes: Vec<u8>,
    /// Present for secp256k1 keys, absent for Ed25519
    pub evm_alias: Option<EvmAlias>,
    /// The envelope pair this was expanded from
    pub source_pair: SignaturePair,
}

impl ExpandedSignaturePair {
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.source_pair.algorithm
    }

    pub fn signature(&self) -> &[u8] {
        &self.source_pair.signature
    }
}

// =============================================================================
// Messages
// =============================================================================

/// The signed payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Raw bytes; secp256k1 signatures are checked against their keccak256 hash
    Raw(Vec<u8>),
    /// A keccak256 hash computed upstream
    Keccak256Hash([u8; MESSAGE_HASH_LEN]),
}

impl Message {
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Message::Raw(bytes.into())
    }

    /// Wrap a pre-computed hash, rejecting anything that is not 32 bytes.
    pub fn keccak256_hash(hash: &[u8]) -> Result<Self, VerificationError> {
        let hash: [u8; MESSAGE_HASH_LEN] = hash
            .try_into()
            .map_err(|_| VerificationError::InvalidHashLength { actual: hash.len() })?;
        Ok(Message::Keccak256Hash(hash))
    }
}

// =============================================================================
// Verdicts
// =============================================================================

/// Final verdict for a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureVerification {
    key: Key,
    evm_alias: Option<EvmAlias>,
    passed: bool,
}

impl SignatureVerification {
    pub fn new(key: Key, evm_alias: Option<EvmAlias>, passed: bool) -> Self {
        Self {
            key,
            evm_alias,
            passed,
        }
    }

    pub fn passed(key: Key, evm_alias: Option<EvmAlias>) -> Self {
        Self::new(key, evm_alias, true)
    }

    pub fn failed(key: Key, evm_alias: Option<EvmAlias>) -> Self {
        Self::new(key, evm_alias, false)
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn evm_alias(&self) -> Option<&EvmAlias> {
        self.evm_alias.as_ref()
    }

    pub fn has_passed(&self) -> bool {
        self.passed
    }

    pub fn has_failed(&self) -> bool {
        !self.passed
    }
}
