//! Cross-component scenarios that don't fit naturally inside a single
//! module's unit tests: a full build-time-fingerprint-through-verification
//! round trip, and a large-message envelope round trip.

use anchorpq_core::kem::{generate_keypair, ParameterSet};
use anchorpq_core::merkle::DigestAlgorithm;
use anchorpq_core::repository::{CanonicalRecord, CanonicalRecordRepository, InMemoryRepository};
use anchorpq_core::wire::IntegrityPayload;
use anchorpq_core::{envelope, fingerprint, verify};
use anchorpq_core::verify::Decision;

#[test]
fn envelope_round_trips_a_one_mebibyte_message() {
    let kp = generate_keypair(ParameterSet::MlKem768);
    let message = vec![0x5Au8; 1024 * 1024];
    let sealed = envelope::seal_for(ParameterSet::MlKem768, &kp.public_key_bytes, &message).unwrap();
    let opened = envelope::open_with(&sealed, kp.private_key_bytes()).unwrap();
    assert_eq!(opened, message);
}

#[test]
fn build_seal_verify_round_trip_approves_matching_artifact() {
    let build_dir = tempfile::tempdir().unwrap();
    std::fs::write(build_dir.path().join("A.class"), b"alpha-bytes").unwrap();
    std::fs::write(build_dir.path().join("B.class"), b"beta-bytes").unwrap();
    std::fs::write(build_dir.path().join("R.class"), b"must-be-excluded").unwrap();

    let output_dir = tempfile::tempdir().unwrap();
    let built = fingerprint::fingerprint(fingerprint::FingerprintRequest {
        classes_root: build_dir.path(),
        variant: "release",
        version: "2.3.1",
        algorithm: DigestAlgorithm::Sha256,
        signer_fingerprint_hex: None,
        exclude_patterns: fingerprint::default_exclusions(),
        output_dir: output_dir.path(),
    })
    .unwrap();

    let repository = InMemoryRepository::new();
    let now = chrono::Utc::now();
    let signer_fingerprint_hex = "11".repeat(32);
    repository.save_or_update(CanonicalRecord {
        version: "2.3.1".to_string(),
        variant: "release".to_string(),
        merkle_root_hex: built.merkle_root_hex.clone(),
        signer_fingerprint_hex: signer_fingerprint_hex.clone(),
        description: None,
        active: true,
        created_at: now,
        updated_at: now,
    });

    let server_kp = generate_keypair(ParameterSet::MlKem768);
    let payload = IntegrityPayload {
        merkle_root_hex: built.merkle_root_hex,
        version: "2.3.1".to_string(),
        variant: "release".to_string(),
        signer_fingerprint_hex,
    };
    let plaintext = serde_json::to_vec(&payload).unwrap();
    let sealed = envelope::seal_for(ParameterSet::MlKem768, &server_kp.public_key_bytes, &plaintext).unwrap();

    let decision = verify::verify_envelope(&sealed, server_kp.private_key_bytes(), &repository);
    assert_eq!(decision, Decision::Approved);
}

#[test]
fn build_seal_verify_rejects_tampered_build_output() {
    let build_dir = tempfile::tempdir().unwrap();
    std::fs::write(build_dir.path().join("A.class"), b"alpha-bytes").unwrap();

    let output_dir = tempfile::tempdir().unwrap();
    fingerprint::fingerprint(fingerprint::FingerprintRequest {
        classes_root: build_dir.path(),
        variant: "release",
        version: "2.3.1",
        algorithm: DigestAlgorithm::Sha256,
        signer_fingerprint_hex: None,
        exclude_patterns: fingerprint::default_exclusions(),
        output_dir: output_dir.path(),
    })
    .unwrap();

    // Registered canonical root is for a build that never happened.
    let repository = InMemoryRepository::new();
    let now = chrono::Utc::now();
    repository.save_or_update(CanonicalRecord {
        version: "2.3.1".to_string(),
        variant: "release".to_string(),
        merkle_root_hex: "9".repeat(64),
        signer_fingerprint_hex: "1".repeat(64),
        description: None,
        active: true,
        created_at: now,
        updated_at: now,
    });

    // Attacker rebuilds with different content; root does not match.
    std::fs::write(build_dir.path().join("A.class"), b"tampered-bytes").unwrap();
    let retampered = fingerprint::fingerprint(fingerprint::FingerprintRequest {
        classes_root: build_dir.path(),
        variant: "release",
        version: "2.3.1",
        algorithm: DigestAlgorithm::Sha256,
        signer_fingerprint_hex: None,
        exclude_patterns: fingerprint::default_exclusions(),
        output_dir: output_dir.path(),
    })
    .unwrap();

    let server_kp = generate_keypair(ParameterSet::MlKem768);
    let payload = IntegrityPayload {
        merkle_root_hex: retampered.merkle_root_hex,
        version: "2.3.1".to_string(),
        variant: "release".to_string(),
        signer_fingerprint_hex: "1".repeat(64),
    };
    let plaintext = serde_json::to_vec(&payload).unwrap();
    let sealed = envelope::seal_for(ParameterSet::MlKem768, &server_kp.public_key_bytes, &plaintext).unwrap();

    let decision = verify::verify_envelope(&sealed, server_kp.private_key_bytes(), &repository);
    match decision {
        Decision::Rejected { error_code, .. } => assert_eq!(error_code, "ERR_MERKLE_MISMATCH"),
        other => panic!("expected merkle mismatch rejection, got {other:?}"),
    }
}
