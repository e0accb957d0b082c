//! Component D: the verification core. `verify_integrity` walks the
//! `Received → Looked-Up → Compared → Decided` state machine from §4.D;
//! `verify_envelope` wraps it with the upstream decapsulate/open step so a
//! transport only ever has to hand over raw envelope bytes.

use crate::envelope::{self, Envelope};
use crate::error::{EnvelopeError, VerifyError};
use crate::repository::CanonicalRecordRepository;
use crate::security::constant_time_eq;
use crate::wire::IntegrityPayload;
use chrono::Utc;

const MAX_VERSION_LEN: usize = 50;
const MAX_VARIANT_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Restricted,
    Rejected { error_code: String, message: String },
}

impl Decision {
    /// Builds a `Rejected` decision from the stable `VerifyError` taxonomy
    /// (§7); `detail` carries the specific reason within that error class.
    fn rejected(err: VerifyError, detail: &str) -> Self {
        Decision::Rejected {
            error_code: err.code(),
            message: detail.to_string(),
        }
    }
}

fn is_valid_hex64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// `Received` transition: structural validation only, no I/O.
fn validate_request(payload: &IntegrityPayload) -> Result<(), Decision> {
    if payload.version.is_empty() || payload.version.len() > MAX_VERSION_LEN {
        return Err(Decision::rejected(VerifyError::InvalidRequest, "invalid version"));
    }
    if payload.variant.is_empty() || payload.variant.len() > MAX_VARIANT_LEN {
        return Err(Decision::rejected(VerifyError::InvalidRequest, "invalid variant"));
    }
    if !is_valid_hex64(&payload.merkle_root_hex) {
        return Err(Decision::rejected(VerifyError::InvalidRequest, "malformed merkleRoot"));
    }
    if !is_valid_hex64(&payload.signer_fingerprint_hex) {
        return Err(Decision::rejected(VerifyError::InvalidRequest, "malformed signerFingerprint"));
    }
    Ok(())
}

/// The core request-processing operation. Runs entirely against
/// `repository`; never mutates it.
pub fn verify_integrity(
    payload: &IntegrityPayload,
    repository: &dyn CanonicalRecordRepository,
) -> Decision {
    if let Err(decision) = validate_request(payload) {
        return decision;
    }

    // `Looked-Up`: unknown version/variant takes precedence over every
    // later comparison — the server never reveals whether an unknown
    // version's root would have matched.
    let record = match repository.find_active(&payload.version, &payload.variant) {
        Some(record) => record,
        None => return Decision::rejected(VerifyError::UnknownVersion, "no active record for version/variant"),
    };

    // `Compared`: merkle mismatch outranks signer mismatch.
    let payload_root = payload.merkle_root_hex.to_ascii_lowercase();
    let canonical_root = record.merkle_root_hex.to_ascii_lowercase();
    if !constant_time_eq(payload_root.as_bytes(), canonical_root.as_bytes()) {
        return Decision::rejected(VerifyError::MerkleMismatch, "merkle root mismatch");
    }

    let payload_signer = payload.signer_fingerprint_hex.to_ascii_lowercase();
    let canonical_signer = record.signer_fingerprint_hex.to_ascii_lowercase();
    if !constant_time_eq(payload_signer.as_bytes(), canonical_signer.as_bytes()) {
        // Policy downgrade, not a rejection: no error code.
        return Decision::Restricted;
    }

    Decision::Approved
}

/// Opens `envelope` under the server's private key, parses the cleartext as
/// an [`IntegrityPayload`], and runs [`verify_integrity`]. Any failure prior
/// to recovering a payload — decapsulation, key derivation, AEAD auth — is
/// reported as `REJECTED(ERR_CRYPTO)` and never reaches the repository.
pub fn verify_envelope(
    envelope: &Envelope,
    recipient_private_key: &[u8],
    repository: &dyn CanonicalRecordRepository,
) -> Decision {
    let plaintext = match envelope::open_with(envelope, recipient_private_key) {
        Ok(bytes) => bytes,
        Err(err) => {
            if matches!(err, EnvelopeError::AuthenticationFailed) {
                eprintln!("warning: envelope authentication failed ({}), possible tampering", err.code());
            }
            return Decision::rejected(VerifyError::CryptoFailure(err.code()), err.code());
        }
    };

    let payload: IntegrityPayload = match serde_json::from_slice(&plaintext) {
        Ok(payload) => payload,
        Err(_) => return Decision::rejected(VerifyError::InvalidRequest, "payload is not valid JSON"),
    };

    verify_integrity(&payload, repository)
}

/// Wraps a missing/unreachable repository backend as `ERR_INTERNAL`,
/// matching the propagation policy in §7 (repository errors never leak
/// backend detail and never yield approval).
pub fn internal_failure_decision() -> Decision {
    Decision::rejected(VerifyError::InternalFailure, "repository unavailable")
}

pub fn decision_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{CanonicalRecord, InMemoryRepository};

    fn canonical() -> CanonicalRecord {
        let now = chrono::Utc::now();
        CanonicalRecord {
            version: "1.0.0".to_string(),
            variant: "release".to_string(),
            merkle_root_hex: "a1b2c3d4e5f6789012345678901234567890123456789012345678901234abcd"
                [..64]
                .to_string(),
            signer_fingerprint_hex: "fedcba0987654321fedcba0987654321fedcba0987654321fedcba09876543fe"
                [..64]
                .to_string(),
            description: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn payload_from(record: &CanonicalRecord) -> IntegrityPayload {
        IntegrityPayload {
            merkle_root_hex: record.merkle_root_hex.clone(),
            version: record.version.clone(),
            variant: record.variant.clone(),
            signer_fingerprint_hex: record.signer_fingerprint_hex.clone(),
        }
    }

    #[test]
    fn exact_match_is_approved() {
        let repo = InMemoryRepository::new();
        let record = canonical();
        repo.save_or_update(record.clone());
        let payload = payload_from(&record);
        assert_eq!(verify_integrity(&payload, &repo), Decision::Approved);
    }

    #[test]
    fn merkle_mismatch_is_rejected() {
        let repo = InMemoryRepository::new();
        let record = canonical();
        repo.save_or_update(record.clone());
        let mut payload = payload_from(&record);
        payload.merkle_root_hex = "0".repeat(64);
        assert_eq!(
            verify_integrity(&payload, &repo),
            Decision::rejected(VerifyError::MerkleMismatch, "merkle root mismatch")
        );
    }

    #[test]
    fn signer_mismatch_is_restricted_not_rejected() {
        let repo = InMemoryRepository::new();
        let record = canonical();
        repo.save_or_update(record.clone());
        let mut payload = payload_from(&record);
        payload.signer_fingerprint_hex = "0".repeat(64);
        assert_eq!(verify_integrity(&payload, &repo), Decision::Restricted);
    }

    #[test]
    fn unknown_version_is_rejected_regardless_of_other_fields() {
        let repo = InMemoryRepository::new();
        let record = canonical();
        repo.save_or_update(record.clone());
        let mut payload = payload_from(&record);
        payload.version = "99.99.99".to_string();
        assert_eq!(
            verify_integrity(&payload, &repo),
            Decision::rejected(VerifyError::UnknownVersion, "no active record for version/variant")
        );
    }

    #[test]
    fn unknown_version_outranks_merkle_mismatch() {
        let repo = InMemoryRepository::new();
        let record = canonical();
        repo.save_or_update(record.clone());
        let mut payload = payload_from(&record);
        payload.version = "99.99.99".to_string();
        payload.merkle_root_hex = "0".repeat(64);
        assert_eq!(
            verify_integrity(&payload, &repo),
            Decision::rejected(VerifyError::UnknownVersion, "no active record for version/variant")
        );
    }

    #[test]
    fn uppercase_hex_still_matches() {
        let repo = InMemoryRepository::new();
        let record = canonical();
        repo.save_or_update(record.clone());
        let mut payload = payload_from(&record);
        payload.merkle_root_hex = payload.merkle_root_hex.to_ascii_uppercase();
        assert_eq!(verify_integrity(&payload, &repo), Decision::Approved);
    }

    #[test]
    fn invalid_hex_length_is_rejected() {
        let repo = InMemoryRepository::new();
        let mut payload = payload_from(&canonical());
        payload.merkle_root_hex = "ab".to_string();
        assert_eq!(
            verify_integrity(&payload, &repo),
            Decision::rejected(VerifyError::InvalidRequest, "malformed merkleRoot")
        );
    }

    #[test]
    fn oversized_version_is_rejected() {
        let repo = InMemoryRepository::new();
        let mut payload = payload_from(&canonical());
        payload.version = "v".repeat(51);
        assert_eq!(
            verify_integrity(&payload, &repo),
            Decision::rejected(VerifyError::InvalidRequest, "invalid version")
        );
    }

    #[test]
    fn tampered_envelope_is_rejected_before_repository_lookup() {
        use crate::kem::{generate_keypair, ParameterSet};

        let repo = InMemoryRepository::new();
        repo.save_or_update(canonical());
        let kp = generate_keypair(ParameterSet::MlKem768);
        let plaintext = serde_json::to_vec(&payload_from(&canonical())).unwrap();
        let env = envelope::seal_for(ParameterSet::MlKem768, &kp.public_key_bytes, &plaintext).unwrap();
        let mut bytes = env.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = Envelope::from_bytes(ParameterSet::MlKem768, &bytes).unwrap();

        let decision = verify_envelope(&tampered, kp.private_key_bytes(), &repo);
        match decision {
            Decision::Rejected { error_code, .. } => assert_eq!(error_code, "ERR_CRYPTO"),
            other => panic!("expected ERR_CRYPTO rejection, got {other:?}"),
        }
    }

    #[test]
    fn envelope_round_trip_is_approved() {
        use crate::kem::{generate_keypair, ParameterSet};

        let repo = InMemoryRepository::new();
        let record = canonical();
        repo.save_or_update(record.clone());
        let kp = generate_keypair(ParameterSet::MlKem768);
        let plaintext = serde_json::to_vec(&payload_from(&record)).unwrap();
        let env = envelope::seal_for(ParameterSet::MlKem768, &kp.public_key_bytes, &plaintext).unwrap();

        let decision = verify_envelope(&env, kp.private_key_bytes(), &repo);
        assert_eq!(decision, Decision::Approved);
    }
}
