//! AES-256-GCM sealing, the symmetric half of the hybrid envelope (§4.C).
//! Wire layout is `IV(12) ‖ CIPHERTEXT ‖ TAG(16)`, IV prepended so the two
//! pieces a reader needs are both self-describing lengths.

use crate::error::EnvelopeError;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand_core::RngCore;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Seals `plaintext` under `key`, generating a fresh random IV. No
/// associated data is bound in v1 — matches the teacher's own `seal()`
/// contract, generalized to a caller-supplied key rather than a file DEK.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut iv = [0u8; IV_LEN];
    rand_core::OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let sealed = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: b"" })
        .map_err(|_| EnvelopeError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(IV_LEN + sealed.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Opens a buffer produced by [`seal`]. Any authentication failure — tampered
/// ciphertext or the wrong key — is reported as
/// [`EnvelopeError::AuthenticationFailed`], never distinguished further, so a
/// caller cannot use error variants as a tampering oracle.
pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if sealed.len() < IV_LEN + TAG_LEN {
        return Err(EnvelopeError::InvalidCiphertext);
    }
    let (iv, rest) = sealed.split_at(IV_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(iv);

    cipher
        .decrypt(nonce, Payload { msg: rest, aad: b"" })
        .map_err(|_| EnvelopeError::AuthenticationFailed)
}
