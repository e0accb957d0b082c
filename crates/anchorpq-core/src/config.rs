//! Configuration options enumerated in §6. Loaded from JSON; every field has
//! a spec-mandated default so a missing file is never an error.

use crate::kem::ParameterSet;
use serde::{Deserialize, Serialize};

fn default_parameter_set() -> String {
    "ML-KEM-768".to_string()
}

fn default_key_file_path() -> Option<String> {
    None
}

fn default_hkdf_digest() -> String {
    "SHA3-256".to_string()
}

fn default_hkdf_info() -> String {
    crate::kdf::INFO_STRING.iter().map(|b| *b as char).collect()
}

fn default_aead_key_size_bits() -> u32 {
    256
}

fn default_aead_iv_size_bytes() -> u32 {
    12
}

fn default_aead_tag_size_bits() -> u32 {
    128
}

fn default_merkle_digest() -> String {
    "SHA-256".to_string()
}

fn default_merkle_exclude_patterns() -> Vec<String> {
    crate::fingerprint::default_exclusions()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KemConfig {
    pub parameter_set: String,
    pub key_file_path: Option<String>,
}

impl Default for KemConfig {
    fn default() -> Self {
        KemConfig {
            parameter_set: default_parameter_set(),
            key_file_path: default_key_file_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HkdfConfig {
    pub digest: String,
    pub info: String,
}

impl Default for HkdfConfig {
    fn default() -> Self {
        HkdfConfig {
            digest: default_hkdf_digest(),
            info: default_hkdf_info(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AeadConfig {
    pub key_size_bits: u32,
    pub iv_size_bytes: u32,
    pub tag_size_bits: u32,
}

impl Default for AeadConfig {
    fn default() -> Self {
        AeadConfig {
            key_size_bits: default_aead_key_size_bits(),
            iv_size_bytes: default_aead_iv_size_bytes(),
            tag_size_bits: default_aead_tag_size_bits(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MerkleConfig {
    pub digest: String,
    pub exclude_patterns: Vec<String>,
}

impl Default for MerkleConfig {
    fn default() -> Self {
        MerkleConfig {
            digest: default_merkle_digest(),
            exclude_patterns: default_merkle_exclude_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub kem: KemConfig,
    pub hkdf: HkdfConfig,
    pub aead: AeadConfig,
    pub merkle: MerkleConfig,
}

impl Config {
    pub fn load_from_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::load_from_str(&contents)?),
            Err(_) => Ok(Config::default()),
        }
    }

    /// Resolves `kem.parameter_set` into a [`ParameterSet`]. An unrecognized
    /// name falls back to the default with a logged warning (§6, §9) — this
    /// never hard-errors; whether it should in a "strict mode" is an open
    /// question the spec explicitly declines to resolve.
    pub fn resolved_parameter_set(&self) -> ParameterSet {
        match ParameterSet::parse(&self.kem.parameter_set) {
            Some(ps) => ps,
            None => {
                eprintln!(
                    "warning: unknown kem.parameter_set '{}', falling back to default",
                    self.kem.parameter_set
                );
                ParameterSet::default()
            }
        }
    }
}
