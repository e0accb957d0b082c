//! Wire contracts (§6): explicit schema structs in place of reflective JSON
//! binding. Unknown input fields are tolerated via `#[serde(deny_unknown_fields)]`'s
//! absence (the default, permissive behavior) and never echoed back.

use serde::{Deserialize, Serialize};

/// Response body for the server's public-key distribution endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub public_key_b64: String,
    #[serde(rename = "parameterSet")]
    pub parameter_set: String,
    pub algorithm: String,
    #[serde(rename = "generatedAt")]
    pub generated_at_ms: i64,
    #[serde(rename = "keyId")]
    pub key_id: String,
}

/// A verification request as received over the wire. Additional fields the
/// client may send (device info, etc.) are simply absent from this struct
/// and dropped on deserialization rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    #[serde(rename = "encapsulatedKey")]
    pub encapsulated_key_b64: String,
    #[serde(rename = "encryptedPayload")]
    pub encrypted_payload_b64: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// The cleartext payload recovered by opening a [`VerificationRequest`]'s
/// envelope. Fields beyond the four named here MUST be ignored (§6) — this
/// struct simply does not declare them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityPayload {
    #[serde(rename = "merkleRoot")]
    pub merkle_root_hex: String,
    pub version: String,
    pub variant: String,
    #[serde(rename = "signerFingerprint")]
    pub signer_fingerprint_hex: String,
}

/// The response body for a verification call. `error_code` is `Some` only on
/// `REJECTED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub status: String,
    pub message: String,
    pub timestamp: i64,
    #[serde(rename = "errorCode", default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl VerificationResponse {
    pub fn from_decision(decision: &crate::verify::Decision, timestamp_ms: i64) -> Self {
        use crate::verify::Decision;
        match decision {
            Decision::Approved => VerificationResponse {
                status: "APPROVED".to_string(),
                message: "integrity verified".to_string(),
                timestamp: timestamp_ms,
                error_code: None,
            },
            Decision::Restricted => VerificationResponse {
                status: "RESTRICTED".to_string(),
                message: "signer fingerprint mismatch".to_string(),
                timestamp: timestamp_ms,
                error_code: None,
            },
            Decision::Rejected { error_code, message } => VerificationResponse {
                status: "REJECTED".to_string(),
                message: message.clone(),
                timestamp: timestamp_ms,
                error_code: Some(error_code.clone()),
            },
        }
    }
}
