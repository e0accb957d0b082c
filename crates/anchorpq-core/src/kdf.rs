//! Key derivation: HKDF over the ML-KEM shared secret, producing the AEAD
//! content-encryption key (§4.C). Deliberately SHA3-256, not the SHA3-384
//! the rest of this lineage favors elsewhere — see DESIGN.md.

use crate::error::EnvelopeError;
use hkdf::Hkdf;
use sha3::Sha3_256;

pub const INFO_STRING: &[u8] = b"AnchorPQ-v1-IntegrityVerification";

/// Derives a 32-byte AES-256-GCM key from `shared_secret`.
///
/// `salt` is optional: when absent, the extract phase is skipped entirely and
/// `shared_secret` is used directly as the pseudo-random key (§4.C) via
/// `Hkdf::from_prk` — `Hkdf::new(None, ..)` would still run HMAC-extract under
/// an implicit zero salt per RFC 5869, which is not what "skipped" means
/// here. The `info` string is fixed to [`INFO_STRING`] so derivation is bound
/// to this scheme's context.
pub fn derive_aead_key(
    shared_secret: &[u8],
    salt: Option<&[u8]>,
) -> Result<[u8; 32], EnvelopeError> {
    let mut okm = [0u8; 32];
    match salt {
        Some(salt) => {
            let hk = Hkdf::<Sha3_256>::new(Some(salt), shared_secret);
            hk.expand(INFO_STRING, &mut okm)
                .map_err(|_| EnvelopeError::KeyDerivationFailed)?;
        }
        None => {
            let hk = Hkdf::<Sha3_256>::from_prk(shared_secret)
                .map_err(|_| EnvelopeError::KeyDerivationFailed)?;
            hk.expand(INFO_STRING, &mut okm)
                .map_err(|_| EnvelopeError::KeyDerivationFailed)?;
        }
    }
    Ok(okm)
}
