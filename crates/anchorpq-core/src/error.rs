use thiserror::Error;

/// Errors raised by the hash & Merkle engine (component A).
#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("leaf sequence is empty")]
    EmptyInput,
    #[error("leaf index {index} out of range (len={len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors raised by the build-time fingerprinter (component B).
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("input directory missing: {0}")]
    InputDirectoryMissing(String),
    #[error("failed to read {path}: {source}")]
    ReadFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("no retained inputs under classes root")]
    NoInputs,
    #[error("failed to write output: {0}")]
    OutputWriteFailure(String),
}

impl From<MerkleError> for FingerprintError {
    fn from(err: MerkleError) -> Self {
        match err {
            MerkleError::UnsupportedAlgorithm(a) => FingerprintError::UnsupportedAlgorithm(a),
            MerkleError::EmptyInput => FingerprintError::NoInputs,
            MerkleError::IndexOutOfRange { .. } => {
                FingerprintError::OutputWriteFailure("internal proof index error".into())
            }
        }
    }
}

/// Errors raised by the hybrid post-quantum envelope (component C).
///
/// The `code()` accessor returns the stable `CRYPTO_0xx` identifier from the
/// error taxonomy; it is what callers place in wire-visible error responses.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("key generation failed")]
    KeyGenerationFailed,
    #[error("encapsulation failed")]
    EncapsulationFailed,
    #[error("decapsulation failed")]
    DecapsulationFailed,
    #[error("key derivation failed")]
    KeyDerivationFailed,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("ciphertext too short or malformed")]
    InvalidCiphertext,
    #[error("AEAD authentication failed")]
    AuthenticationFailed,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid envelope framing")]
    InvalidEnvelope,
}

impl EnvelopeError {
    pub fn code(&self) -> &'static str {
        match self {
            EnvelopeError::KeyGenerationFailed => "CRYPTO_001",
            EnvelopeError::EncapsulationFailed => "CRYPTO_002",
            EnvelopeError::DecapsulationFailed => "CRYPTO_003",
            EnvelopeError::KeyDerivationFailed => "CRYPTO_004",
            EnvelopeError::EncryptionFailed => "CRYPTO_005",
            EnvelopeError::DecryptionFailed => "CRYPTO_006",
            EnvelopeError::InvalidCiphertext => "CRYPTO_007",
            EnvelopeError::AuthenticationFailed => "CRYPTO_008",
            EnvelopeError::InvalidPublicKey => "CRYPTO_009",
            EnvelopeError::InvalidEnvelope => "CRYPTO_010",
            EnvelopeError::InvalidPrivateKey => "CRYPTO_011",
        }
    }
}

/// Errors raised by the verification core (component D).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid request")]
    InvalidRequest,
    #[error("unknown version/variant")]
    UnknownVersion,
    #[error("merkle root mismatch")]
    MerkleMismatch,
    #[error("internal failure")]
    InternalFailure,
    #[error("upstream envelope failure: {0}")]
    CryptoFailure(&'static str),
}

impl VerifyError {
    pub fn code(&self) -> String {
        match self {
            VerifyError::InvalidRequest => "ERR_INVALID_REQUEST".to_string(),
            VerifyError::UnknownVersion => "ERR_UNKNOWN_VERSION".to_string(),
            VerifyError::MerkleMismatch => "ERR_MERKLE_MISMATCH".to_string(),
            VerifyError::InternalFailure => "ERR_INTERNAL".to_string(),
            VerifyError::CryptoFailure(_) => "ERR_CRYPTO".to_string(),
        }
    }
}
