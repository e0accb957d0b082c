//! Component C: the hybrid post-quantum envelope. One-shot `seal_for` /
//! `open_with` combine ML-KEM encapsulation, HKDF-SHA3-256 derivation and
//! AES-256-GCM sealing per §4.C; `Envelope::{to_bytes,from_bytes}` give the
//! binary wire framing from §6.

use crate::aead;
use crate::error::EnvelopeError;
use crate::kdf;
use crate::kem::{self, ParameterSet};

/// A self-contained sealed message: the KEM encapsulation plus the AEAD
/// ciphertext needed to recover it, nothing else.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub parameter_set: ParameterSet,
    pub encapsulation_bytes: Vec<u8>,
    pub sealed_bytes: Vec<u8>,
}

impl Envelope {
    /// `u32_be(len(encapsulation_bytes)) ‖ encapsulation_bytes ‖ sealed_bytes`
    /// (§4.C, §6) — bit-exact, no parameter-set tag. The parameter set is
    /// supplied out of band by whatever context produced this envelope (it is
    /// not itself part of the wire-compatible framing).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.encapsulation_bytes.len() + self.sealed_bytes.len());
        out.extend_from_slice(&(self.encapsulation_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.encapsulation_bytes);
        out.extend_from_slice(&self.sealed_bytes);
        out
    }

    /// Parses framing produced by [`Self::to_bytes`]. Since the framing
    /// carries no parameter-set tag, the caller must supply the parameter set
    /// the envelope was sealed under.
    pub fn from_bytes(parameter_set: ParameterSet, bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < 4 {
            return Err(EnvelopeError::InvalidEnvelope);
        }
        let kem_len = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let rest = &bytes[4..];
        if rest.len() < kem_len {
            return Err(EnvelopeError::InvalidEnvelope);
        }
        let (encapsulation_bytes, sealed_bytes) = rest.split_at(kem_len);
        Ok(Envelope {
            parameter_set,
            encapsulation_bytes: encapsulation_bytes.to_vec(),
            sealed_bytes: sealed_bytes.to_vec(),
        })
    }
}

/// Encapsulates against `recipient_public_key`, derives an AEAD key from the
/// resulting shared secret, and seals `plaintext` under it. Two calls with
/// identical inputs never produce identical output — both the KEM
/// encapsulation and the AEAD IV are freshly randomized.
pub fn seal_for(
    parameter_set: ParameterSet,
    recipient_public_key: &[u8],
    plaintext: &[u8],
) -> Result<Envelope, EnvelopeError> {
    let (encapsulation_bytes, shared_secret) = kem::encapsulate(parameter_set, recipient_public_key)?;
    let key = kdf::derive_aead_key(&shared_secret, None)?;
    let sealed_bytes = aead::seal(&key, plaintext)?;
    Ok(Envelope {
        parameter_set,
        encapsulation_bytes,
        sealed_bytes,
    })
}

/// Decapsulates `envelope.encapsulation_bytes` under `recipient_private_key`,
/// re-derives the same AEAD key, and opens `envelope.sealed_bytes`.
pub fn open_with(
    envelope: &Envelope,
    recipient_private_key: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let shared_secret = kem::decapsulate(
        envelope.parameter_set,
        recipient_private_key,
        &envelope.encapsulation_bytes,
    )?;
    let key = kdf::derive_aead_key(&shared_secret, None)?;
    aead::open(&key, &envelope.sealed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kem::generate_keypair;

    #[test]
    fn round_trip_every_parameter_set() {
        for ps in [ParameterSet::MlKem512, ParameterSet::MlKem768, ParameterSet::MlKem1024] {
            let kp = generate_keypair(ps);
            let envelope = seal_for(ps, &kp.public_key_bytes, b"integrity payload").unwrap();
            let opened = open_with(&envelope, kp.private_key_bytes()).unwrap();
            assert_eq!(opened, b"integrity payload");
        }
    }

    #[test]
    fn wire_framing_round_trips() {
        let kp = generate_keypair(ParameterSet::MlKem768);
        let envelope = seal_for(ParameterSet::MlKem768, &kp.public_key_bytes, b"hi").unwrap();
        let bytes = envelope.to_bytes();
        let parsed = Envelope::from_bytes(ParameterSet::MlKem768, &bytes).unwrap();
        assert_eq!(parsed.parameter_set, envelope.parameter_set);
        assert_eq!(parsed.encapsulation_bytes, envelope.encapsulation_bytes);
        assert_eq!(parsed.sealed_bytes, envelope.sealed_bytes);
        let opened = open_with(&parsed, kp.private_key_bytes()).unwrap();
        assert_eq!(opened, b"hi");
    }

    #[test]
    fn sealing_is_probabilistic() {
        let kp = generate_keypair(ParameterSet::MlKem768);
        let e1 = seal_for(ParameterSet::MlKem768, &kp.public_key_bytes, b"same").unwrap();
        let e2 = seal_for(ParameterSet::MlKem768, &kp.public_key_bytes, b"same").unwrap();
        assert_ne!(e1.to_bytes(), e2.to_bytes());
    }

    #[test]
    fn tampered_envelope_fails_closed() {
        let kp = generate_keypair(ParameterSet::MlKem768);
        let envelope = seal_for(ParameterSet::MlKem768, &kp.public_key_bytes, b"integrity payload").unwrap();
        let mut bytes = envelope.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let parsed = Envelope::from_bytes(ParameterSet::MlKem768, &bytes).unwrap();
        assert!(open_with(&parsed, kp.private_key_bytes()).is_err());
    }

    #[test]
    fn wrong_recipient_key_fails() {
        let kp_a = generate_keypair(ParameterSet::MlKem768);
        let kp_b = generate_keypair(ParameterSet::MlKem768);
        let envelope = seal_for(ParameterSet::MlKem768, &kp_a.public_key_bytes, b"secret").unwrap();
        assert!(open_with(&envelope, kp_b.private_key_bytes()).is_err());
    }

    #[test]
    fn from_bytes_rejects_truncated_input() {
        assert!(Envelope::from_bytes(ParameterSet::MlKem768, &[0, 0]).is_err());
        assert!(Envelope::from_bytes(ParameterSet::MlKem768, &[]).is_err());
    }
}
