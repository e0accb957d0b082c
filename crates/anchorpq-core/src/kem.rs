//! ML-KEM (CRYSTALS-Kyber, FIPS 203) keying, encapsulation and decapsulation —
//! the lattice half of the hybrid envelope (component C, §4.C).

use crate::error::EnvelopeError;
use chrono::{DateTime, Utc};
use pqcrypto_traits::kem::{
    Ciphertext as CiphertextTrait, PublicKey as PublicKeyTrait, SecretKey as SecretKeyTrait,
    SharedSecret as SharedSecretTrait,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// The three NIST ML-KEM parameter sets the spec names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterSet {
    MlKem512,
    MlKem768,
    MlKem1024,
}

impl Default for ParameterSet {
    /// `kem.parameter_set` defaults to `ML-KEM-768` (§6), ≈NIST Level 3.
    fn default() -> Self {
        ParameterSet::MlKem768
    }
}

impl ParameterSet {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ParameterSet::MlKem512 => "ML-KEM-512",
            ParameterSet::MlKem768 => "ML-KEM-768",
            ParameterSet::MlKem1024 => "ML-KEM-1024",
        }
    }

    /// Parses a wire/config name, returning `None` (never an error) for an
    /// unrecognized value — callers fall back to the default with a warning
    /// per §6/§9, they do not hard-fail.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ML-KEM-512" => Some(ParameterSet::MlKem512),
            "ML-KEM-768" => Some(ParameterSet::MlKem768),
            "ML-KEM-1024" => Some(ParameterSet::MlKem1024),
            _ => None,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            ParameterSet::MlKem512 => 1,
            ParameterSet::MlKem768 => 2,
            ParameterSet::MlKem1024 => 3,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, EnvelopeError> {
        match tag {
            1 => Ok(ParameterSet::MlKem512),
            2 => Ok(ParameterSet::MlKem768),
            3 => Ok(ParameterSet::MlKem1024),
            _ => Err(EnvelopeError::InvalidPublicKey),
        }
    }
}

/// `{public_key_bytes, private_key_bytes, parameter_set, key_id, generated_at}`
/// from §3. `private_key_bytes` is wrapped in `Secret` and zeroized on drop;
/// it never leaves this module's callers except through `decapsulate`.
pub struct KemKeypair {
    pub public_key_bytes: Vec<u8>,
    private_key_bytes: Secret<Vec<u8>>,
    pub parameter_set: ParameterSet,
    pub key_id: Uuid,
    pub generated_at: DateTime<Utc>,
}

impl KemKeypair {
    pub fn private_key_bytes(&self) -> &[u8] {
        self.private_key_bytes.expose_secret()
    }
}

/// Generates a fresh keypair with a cryptographically secure RNG.
pub fn generate_keypair(parameter_set: ParameterSet) -> KemKeypair {
    let (pk, sk): (Vec<u8>, Vec<u8>) = match parameter_set {
        ParameterSet::MlKem512 => {
            let (pk, sk) = pqcrypto_mlkem::mlkem512::keypair();
            (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
        }
        ParameterSet::MlKem768 => {
            let (pk, sk) = pqcrypto_mlkem::mlkem768::keypair();
            (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
        }
        ParameterSet::MlKem1024 => {
            let (pk, sk) = pqcrypto_mlkem::mlkem1024::keypair();
            (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
        }
    };

    KemKeypair {
        public_key_bytes: pk,
        private_key_bytes: Secret::new(sk),
        parameter_set,
        key_id: Uuid::new_v4(),
        generated_at: Utc::now(),
    }
}

/// Portable wrapper around the raw ML-KEM public key: a one-byte parameter
/// set tag followed by the KEM's native encoding. `pqcrypto` does not emit an
/// ASN.1 SubjectPublicKeyInfo structure, so this tagged layout is this
/// crate's own "standard portable" form (see DESIGN.md).
pub fn export_public(parameter_set: ParameterSet, public_key_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + public_key_bytes.len());
    out.push(parameter_set.tag());
    out.extend_from_slice(public_key_bytes);
    out
}

pub fn import_public(bytes: &[u8]) -> Result<(ParameterSet, Vec<u8>), EnvelopeError> {
    let (tag, rest) = bytes.split_first().ok_or(EnvelopeError::InvalidPublicKey)?;
    let parameter_set = ParameterSet::from_tag(*tag)?;
    validate_public_key(parameter_set, rest)?;
    Ok((parameter_set, rest.to_vec()))
}

fn validate_public_key(parameter_set: ParameterSet, bytes: &[u8]) -> Result<(), EnvelopeError> {
    let ok = match parameter_set {
        ParameterSet::MlKem512 => pqcrypto_mlkem::mlkem512::PublicKey::from_bytes(bytes).is_ok(),
        ParameterSet::MlKem768 => pqcrypto_mlkem::mlkem768::PublicKey::from_bytes(bytes).is_ok(),
        ParameterSet::MlKem1024 => pqcrypto_mlkem::mlkem1024::PublicKey::from_bytes(bytes).is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(EnvelopeError::InvalidPublicKey)
    }
}

/// Probabilistic encapsulation: two calls with the same `pk` yield distinct
/// `encapsulation_bytes` and distinct `shared_secret`.
pub fn encapsulate(
    parameter_set: ParameterSet,
    public_key_bytes: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), EnvelopeError> {
    match parameter_set {
        ParameterSet::MlKem512 => {
            let pk = pqcrypto_mlkem::mlkem512::PublicKey::from_bytes(public_key_bytes)
                .map_err(|_| EnvelopeError::InvalidPublicKey)?;
            let (ss, ct) = pqcrypto_mlkem::mlkem512::encapsulate(&pk);
            Ok((ct.as_bytes().to_vec(), ss.as_bytes().to_vec()))
        }
        ParameterSet::MlKem768 => {
            let pk = pqcrypto_mlkem::mlkem768::PublicKey::from_bytes(public_key_bytes)
                .map_err(|_| EnvelopeError::InvalidPublicKey)?;
            let (ss, ct) = pqcrypto_mlkem::mlkem768::encapsulate(&pk);
            Ok((ct.as_bytes().to_vec(), ss.as_bytes().to_vec()))
        }
        ParameterSet::MlKem1024 => {
            let pk = pqcrypto_mlkem::mlkem1024::PublicKey::from_bytes(public_key_bytes)
                .map_err(|_| EnvelopeError::InvalidPublicKey)?;
            let (ss, ct) = pqcrypto_mlkem::mlkem1024::encapsulate(&pk);
            Ok((ct.as_bytes().to_vec(), ss.as_bytes().to_vec()))
        }
    }
}

/// Deterministic given inputs: yields the same `shared_secret` as the
/// corresponding `encapsulate` call.
pub fn decapsulate(
    parameter_set: ParameterSet,
    secret_key_bytes: &[u8],
    encapsulation_bytes: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    match parameter_set {
        ParameterSet::MlKem512 => {
            let sk = pqcrypto_mlkem::mlkem512::SecretKey::from_bytes(secret_key_bytes)
                .map_err(|_| EnvelopeError::InvalidPrivateKey)?;
            let ct = pqcrypto_mlkem::mlkem512::Ciphertext::from_bytes(encapsulation_bytes)
                .map_err(|_| EnvelopeError::DecapsulationFailed)?;
            let ss = pqcrypto_mlkem::mlkem512::decapsulate(&ct, &sk);
            Ok(ss.as_bytes().to_vec())
        }
        ParameterSet::MlKem768 => {
            let sk = pqcrypto_mlkem::mlkem768::SecretKey::from_bytes(secret_key_bytes)
                .map_err(|_| EnvelopeError::InvalidPrivateKey)?;
            let ct = pqcrypto_mlkem::mlkem768::Ciphertext::from_bytes(encapsulation_bytes)
                .map_err(|_| EnvelopeError::DecapsulationFailed)?;
            let ss = pqcrypto_mlkem::mlkem768::decapsulate(&ct, &sk);
            Ok(ss.as_bytes().to_vec())
        }
        ParameterSet::MlKem1024 => {
            let sk = pqcrypto_mlkem::mlkem1024::SecretKey::from_bytes(secret_key_bytes)
                .map_err(|_| EnvelopeError::InvalidPrivateKey)?;
            let ct = pqcrypto_mlkem::mlkem1024::Ciphertext::from_bytes(encapsulation_bytes)
                .map_err(|_| EnvelopeError::DecapsulationFailed)?;
            let ss = pqcrypto_mlkem::mlkem1024::decapsulate(&ct, &sk);
            Ok(ss.as_bytes().to_vec())
        }
    }
}

/// Persists a keypair as `[tag][u32_be len(pk)][pk][sk]` with owner-only
/// permissions. Per the spec's own Open Question resolution (§9), this
/// replaces a reflective/object-graph format with the KEM's native encoding
/// plus a simple length-prefixed pair.
pub fn persist(keypair: &KemKeypair, path: &std::path::Path) -> Result<(), EnvelopeError> {
    let mut buf = Vec::new();
    buf.push(keypair.parameter_set.tag());
    buf.extend_from_slice(&(keypair.public_key_bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(&keypair.public_key_bytes);
    buf.extend_from_slice(keypair.private_key_bytes());
    std::fs::write(path, &buf).map_err(|_| EnvelopeError::KeyGenerationFailed)?;
    crate::security::set_secure_permissions(path).ok();
    Ok(())
}

pub fn load(path: &std::path::Path) -> Result<KemKeypair, EnvelopeError> {
    let buf = std::fs::read(path).map_err(|_| EnvelopeError::InvalidPrivateKey)?;
    let (tag, rest) = buf.split_first().ok_or(EnvelopeError::InvalidPrivateKey)?;
    let parameter_set = ParameterSet::from_tag(*tag)?;
    if rest.len() < 4 {
        return Err(EnvelopeError::InvalidPrivateKey);
    }
    let pk_len = u32::from_be_bytes(rest[0..4].try_into().unwrap()) as usize;
    let rest = &rest[4..];
    if rest.len() < pk_len {
        return Err(EnvelopeError::InvalidPrivateKey);
    }
    let public_key_bytes = rest[..pk_len].to_vec();
    let private_key_bytes = rest[pk_len..].to_vec();
    validate_public_key(parameter_set, &public_key_bytes)?;

    Ok(KemKeypair {
        public_key_bytes,
        private_key_bytes: Secret::new(private_key_bytes),
        parameter_set,
        key_id: Uuid::new_v4(),
        generated_at: Utc::now(),
    })
}

/// The process-wide keypair singleton (§5, §9). `init` is idempotent: the
/// first caller's config wins, later calls just return the existing handle.
/// There is no lazy re-initialization and no way to replace the handle
/// short of restarting the process.
pub struct KemHandle {
    pub keypair: KemKeypair,
}

static KEM_HANDLE: OnceLock<KemHandle> = OnceLock::new();

impl KemHandle {
    /// Loads the keypair from `key_file_path` if present and valid,
    /// otherwise generates a fresh one under `parameter_set` and, if a path
    /// was given, persists it for next time.
    pub fn init(parameter_set: ParameterSet, key_file_path: Option<&std::path::Path>) -> &'static KemHandle {
        KEM_HANDLE.get_or_init(|| {
            let keypair = match key_file_path {
                Some(path) => match load(path) {
                    Ok(keypair) => keypair,
                    Err(_) => {
                        let keypair = generate_keypair(parameter_set);
                        persist(&keypair, path).ok();
                        keypair
                    }
                },
                None => generate_keypair(parameter_set),
            };
            KemHandle { keypair }
        })
    }

    pub fn get() -> Option<&'static KemHandle> {
        KEM_HANDLE.get()
    }
}
