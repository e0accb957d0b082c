//! AnchorPQ core: deterministic Merkle fingerprinting, a hybrid ML-KEM/AES-GCM
//! envelope, and a constant-time integrity verification core.
//!
//! Four components, leaves-first: [`merkle`] hashes and trees, [`fingerprint`]
//! reduces a compiled artifact to a root hash, [`kem`]/[`kdf`]/[`aead`]/
//! [`envelope`] carry a post-quantum sealed message, and [`verify`] decides.

pub mod aead;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod kdf;
pub mod kem;
pub mod merkle;
pub mod repository;
pub mod security;
pub mod verify;
pub mod wire;

pub use envelope::Envelope;
pub use error::{EnvelopeError, FingerprintError, MerkleError, VerifyError};
pub use kem::{KemHandle, KemKeypair, ParameterSet};
pub use merkle::{Digest, DigestAlgorithm, MerkleTree};
pub use repository::{CanonicalRecord, CanonicalRecordRepository, InMemoryRepository};
pub use verify::Decision;
