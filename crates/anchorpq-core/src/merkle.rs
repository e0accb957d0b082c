//! Component A: content hashing and deterministic Merkle tree construction.

use crate::error::MerkleError;
use crate::security::constant_time_eq;
use sha2::{Digest as Sha2DigestTrait, Sha256, Sha384, Sha512};
use sha3::{Sha3_256, Sha3_512};
use std::fmt;

/// Supported digest families. Parsed from a config/CLI string via
/// [`DigestAlgorithm::parse`]; an unrecognized name is the one place this
/// contract can actually fail with `UnsupportedAlgorithm` — once you hold a
/// `DigestAlgorithm` the algorithm is known-good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Sha3_512,
}

impl DigestAlgorithm {
    pub fn parse(name: &str) -> Result<Self, MerkleError> {
        match name.to_ascii_uppercase().replace('_', "-").as_str() {
            "SHA-256" | "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA-384" | "SHA384" => Ok(DigestAlgorithm::Sha384),
            "SHA-512" | "SHA512" => Ok(DigestAlgorithm::Sha512),
            "SHA3-256" => Ok(DigestAlgorithm::Sha3_256),
            "SHA3-512" => Ok(DigestAlgorithm::Sha3_512),
            other => Err(MerkleError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
            DigestAlgorithm::Sha3_256 => "SHA3-256",
            DigestAlgorithm::Sha3_512 => "SHA3-512",
        }
    }

    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 | DigestAlgorithm::Sha3_256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 | DigestAlgorithm::Sha3_512 => 64,
        }
    }
}

/// An opaque, fixed-width digest. Equality and ordering are byte-for-byte;
/// text rendering is always lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Vec<u8>);

impl Digest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        hex::decode(s).ok().map(Digest)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Single-shot digest over `bytes` under `algorithm`.
pub fn hash(bytes: &[u8], algorithm: DigestAlgorithm) -> Digest {
    let out = match algorithm {
        DigestAlgorithm::Sha256 => Sha256::digest(bytes).to_vec(),
        DigestAlgorithm::Sha384 => Sha384::digest(bytes).to_vec(),
        DigestAlgorithm::Sha512 => Sha512::digest(bytes).to_vec(),
        DigestAlgorithm::Sha3_256 => Sha3_256::digest(bytes).to_vec(),
        DigestAlgorithm::Sha3_512 => Sha3_512::digest(bytes).to_vec(),
    };
    Digest(out)
}

/// Single digest over `left ‖ right` — no separator, no length prefix.
pub fn hash_concat(left: &Digest, right: &Digest, algorithm: DigestAlgorithm) -> Digest {
    let mut buf = Vec::with_capacity(left.as_bytes().len() + right.as_bytes().len());
    buf.extend_from_slice(left.as_bytes());
    buf.extend_from_slice(right.as_bytes());
    hash(&buf, algorithm)
}

/// `constant_time_equals` from §4.A: ORs all byte differences, short-circuits
/// only on length mismatch.
pub fn constant_time_equals(a: &Digest, b: &Digest) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

/// A `(relative_path, content_hash)` pair. Only `content_hash` participates in
/// the tree; `relative_path` determines leaf ordering.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub relative_path: String,
    pub content_hash: Digest,
}

/// Which side of a combining step a proof's sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct ProofNode {
    pub sibling_hash: Digest,
    pub side: Side,
}

/// An immutable, fully-computed Merkle tree. All levels are retained so that
/// `proof()` can walk upward without recomputation.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    algorithm: DigestAlgorithm,
    /// `levels[0]` is the leaf level; `levels.last()` is `[root]`.
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Builds and fully computes the tree from an ordered, non-empty leaf
    /// hash sequence. The odd-node policy pairs a dangling final node with
    /// itself at every level — the leaf list itself is never mutated.
    pub fn new(leaf_hashes: Vec<Digest>, algorithm: DigestAlgorithm) -> Result<Self, MerkleError> {
        if leaf_hashes.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let mut levels = vec![leaf_hashes];
        while levels.last().unwrap().len() > 1 {
            let current = levels.last().unwrap();
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            let mut i = 0;
            while i < current.len() {
                let left = &current[i];
                let right = if i + 1 < current.len() {
                    &current[i + 1]
                } else {
                    left
                };
                next.push(hash_concat(left, right, algorithm));
                i += 2;
            }
            levels.push(next);
        }

        Ok(MerkleTree { algorithm, levels })
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn root(&self) -> &Digest {
        &self.levels.last().unwrap()[0]
    }

    pub fn root_hex(&self) -> String {
        self.root().to_hex()
    }

    /// Builds an inclusion proof for the leaf at `leaf_index`.
    ///
    /// At each level: if the running index is even, the sibling sits at
    /// `index + 1` on the Right — or, if that position does not exist, the
    /// sibling is the node itself (mirroring the odd-pairing policy used to
    /// build the tree). If the running index is odd, the sibling sits at
    /// `index - 1` on the Left. The index for the next level is `index / 2`.
    pub fn proof(&self, leaf_index: usize) -> Result<Vec<ProofNode>, MerkleError> {
        let len = self.levels[0].len();
        if leaf_index >= len {
            return Err(MerkleError::IndexOutOfRange {
                index: leaf_index,
                len,
            });
        }

        let mut proof = Vec::new();
        let mut idx = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            if idx % 2 == 0 {
                let sibling = level.get(idx + 1).unwrap_or(&level[idx]);
                proof.push(ProofNode {
                    sibling_hash: sibling.clone(),
                    side: Side::Right,
                });
            } else {
                proof.push(ProofNode {
                    sibling_hash: level[idx - 1].clone(),
                    side: Side::Left,
                });
            }
            idx /= 2;
        }
        Ok(proof)
    }
}

/// Walks `proof`, combining `(left, right)` per `side`, and compares the
/// final hash to `expected_root` in constant time.
pub fn verify_proof(
    leaf: &Digest,
    proof: &[ProofNode],
    expected_root: &Digest,
    algorithm: DigestAlgorithm,
) -> bool {
    let mut running = leaf.clone();
    for node in proof {
        running = match node.side {
            Side::Right => hash_concat(&running, &node.sibling_hash, algorithm),
            Side::Left => hash_concat(&node.sibling_hash, &running, algorithm),
        };
    }
    constant_time_equals(&running, expected_root)
}
