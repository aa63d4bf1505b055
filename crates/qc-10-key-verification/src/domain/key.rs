//! # Key Model
//!
//! Recursive authorization keys. A key is either a single public key or a
//! compound policy (`KeyList`, `Threshold`) over nested keys, plus the
//! contract-based variants that can only be satisfied by a verification
//! assistant.
//!
//! Ordering agrees with the canonical byte encoding produced by
//! [`Key::canonical_bytes`] but is computed structurally, so keys can be used
//! as `BTreeMap` keys and iterate in a deterministic order on every node.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Length of a raw Ed25519 public key.
pub const ED25519_KEY_LEN: usize = 32;

/// Length of a compressed secp256k1 public key (0x02/0x03 || x).
pub const ECDSA_SECP256K1_COMPRESSED_LEN: usize = 33;

/// Signature algorithm of a primitive key or signature pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// Ed25519 (32-byte public key)
    Ed25519,
    /// ECDSA over secp256k1 (33-byte compressed public key)
    EcdsaSecp256k1,
    /// ECDSA over P-384
    Ecdsa384,
    /// RSA-3072
    Rsa3072,
}

impl KeyAlgorithm {
    /// Length of a complete public key for algorithms this engine can expand.
    ///
    /// Returns `None` for algorithms that never produce expanded pairs.
    pub fn full_key_len(self) -> Option<usize> {
        match self {
            KeyAlgorithm::Ed25519 => Some(ED25519_KEY_LEN),
            KeyAlgorithm::EcdsaSecp256k1 => Some(ECDSA_SECP256K1_COMPRESSED_LEN),
            KeyAlgorithm::Ecdsa384 | KeyAlgorithm::Rsa3072 => None,
        }
    }

    fn tag(self) -> u8 {
        match self {
            KeyAlgorithm::Ed25519 => 0x01,
            KeyAlgorithm::EcdsaSecp256k1 => 0x02,
            KeyAlgorithm::Ecdsa384 => 0x03,
            KeyAlgorithm::Rsa3072 => 0x04,
        }
    }
}

/// Identifier of a smart contract (`shard.realm.num`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl ContractId {
    pub fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

/// An authorization key.
///
/// Invariants:
/// - An empty `KeyList` never authorizes anything.
/// - A `Threshold` key's effective threshold is `max(1, min(threshold, members.len()))`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A single public key.
    Primitive {
        algorithm: KeyAlgorithm,
        bytes: Vec<u8>,
    },
    /// Every member must authorize.
    KeyList(Vec<Key>),
    /// At least `threshold` members must authorize.
    Threshold { threshold: u32, members: Vec<Key> },
    /// Satisfied only when the assistant recognizes the contract.
    ContractId(ContractId),
    /// Like `ContractId`, but also satisfiable through delegate calls.
    DelegatableContractId(ContractId),
    /// No key set.
    Unset,
}

impl Key {
    /// Ed25519 key from raw public key bytes.
    pub fn ed25519(bytes: impl Into<Vec<u8>>) -> Self {
        Key::Primitive {
            algorithm: KeyAlgorithm::Ed25519,
            bytes: bytes.into(),
        }
    }

    /// secp256k1 key from compressed public key bytes.
    pub fn ecdsa_secp256k1(bytes: impl Into<Vec<u8>>) -> Self {
        Key::Primitive {
            algorithm: KeyAlgorithm::EcdsaSecp256k1,
            bytes: bytes.into(),
        }
    }

    pub fn list(members: Vec<Key>) -> Self {
        Key::KeyList(members)
    }

    pub fn threshold(threshold: u32, members: Vec<Key>) -> Self {
        Key::Threshold { threshold, members }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Key::Primitive { .. })
    }

    /// Algorithm and raw bytes of a primitive key.
    pub fn as_primitive(&self) -> Option<(KeyAlgorithm, &[u8])> {
        match self {
            Key::Primitive { algorithm, bytes } => Some((*algorithm, bytes.as_slice())),
            _ => None,
        }
    }

    /// Members of a compound key.
    pub fn members(&self) -> Option<&[Key]> {
        match self {
            Key::KeyList(members) | Key::Threshold { members, .. } => Some(members),
            _ => None,
        }
    }

    /// Canonical, self-delimiting byte encoding of this key.
    ///
    /// The encoding is injective, which keeps `Ord` consistent with `Eq`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_canonical(&mut out);
        out
    }

    fn variant_tag(&self) -> u8 {
        match self {
            Key::Unset => 0x00,
            Key::Primitive { .. } => 0x01,
            Key::KeyList(_) => 0x02,
            Key::Threshold { .. } => 0x03,
            Key::ContractId(_) => 0x04,
            Key::DelegatableContractId(_) => 0x05,
        }
    }

    fn write_canonical(&self, out: &mut Vec<u8>) {
        out.push(self.variant_tag());
        match self {
            Key::Unset => {}
            Key::Primitive { algorithm, bytes } => {
                out.push(algorithm.tag());
                write_len(out, bytes.len());
                out.extend_from_slice(bytes);
            }
            Key::KeyList(members) => {
                write_len(out, members.len());
                for member in members {
                    member.write_canonical(out);
                }
            }
            Key::Threshold { threshold, members } => {
                out.extend_from_slice(&threshold.to_be_bytes());
                write_len(out, members.len());
                for member in members {
                    member.write_canonical(out);
                }
            }
            Key::ContractId(id) | Key::DelegatableContractId(id) => write_contract_id(out, id),
        }
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u64).to_be_bytes());
}

fn write_contract_id(out: &mut Vec<u8>, id: &ContractId) {
    out.extend_from_slice(&id.shard.to_be_bytes());
    out.extend_from_slice(&id.realm.to_be_bytes());
    out.extend_from_slice(&id.num.to_be_bytes());
}

/// Orders keys exactly as their canonical encodings compare, without
/// materializing them.
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Key::Primitive {
                    algorithm: left_algorithm,
                    bytes: left,
                },
                Key::Primitive {
                    algorithm: right_algorithm,
                    bytes: right,
                },
            ) => left_algorithm
                .tag()
                .cmp(&right_algorithm.tag())
                .then_with(|| left.len().cmp(&right.len()))
                .then_with(|| left.cmp(right)),
            (Key::KeyList(left), Key::KeyList(right)) => cmp_members(left, right),
            (
                Key::Threshold {
                    threshold: left_threshold,
                    members: left,
                },
                Key::Threshold {
                    threshold: right_threshold,
                    members: right,
                },
            ) => left_threshold
                .cmp(right_threshold)
                .then_with(|| cmp_members(left, right)),
            (Key::ContractId(left), Key::ContractId(right))
            | (Key::DelegatableContractId(left), Key::DelegatableContractId(right)) => {
                left.cmp(right)
            }
            _ => self.variant_tag().cmp(&other.variant_tag()),
        }
    }
}

/// Length first, then members in order. Encodings are self-delimiting, so
/// this matches a byte comparison of the concatenated member encodings.
fn cmp_members(left: &[Key], right: &[Key]) -> Ordering {
    left.len()
        .cmp(&right.len())
        .then_with(|| left.iter().cmp(right.iter()))
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
