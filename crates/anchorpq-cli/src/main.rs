use anchorpq_core::config::Config;
use anchorpq_core::kem::{self, ParameterSet};
use anchorpq_core::merkle::DigestAlgorithm;
use anchorpq_core::repository::{CanonicalRecord, CanonicalRecordRepository, InMemoryRepository};
use anchorpq_core::wire::{IntegrityPayload, PublicKeyResponse};
use anchorpq_core::{envelope, fingerprint, verify};
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use clap::{Parser, Subcommand};
use humansize::{format_size, BINARY};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "AnchorPQ: build-time Merkle fingerprinting and post-quantum integrity verification")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Reduce a compiled classes directory to a Merkle root and write metadata
    Fingerprint {
        #[arg(long)]
        classes_root: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        #[arg(long)]
        version: String,
        #[arg(long)]
        variant: String,
        #[arg(long, default_value = "SHA-256")]
        digest: String,
        #[arg(long)]
        signer_fingerprint: Option<String>,
    },
    /// Generate a server ML-KEM keypair and persist it to disk
    Keygen {
        #[arg(long, default_value = "ML-KEM-768")]
        parameter_set: String,
        /// Output path (default: $HOME/.anchorpq/server.kemkey)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Seal an integrity payload against a recipient's public key
    Seal {
        #[arg(long)]
        recipient_public_key: PathBuf,
        #[arg(long)]
        merkle_root: String,
        #[arg(long)]
        version: String,
        #[arg(long)]
        variant: String,
        #[arg(long)]
        signer_fingerprint: String,
        #[arg(long)]
        output: PathBuf,
    },
    /// Open a sealed envelope and run it through the verification core
    /// against a local, single-record in-memory repository (demo use only;
    /// a real deployment supplies its own repository).
    Verify {
        #[arg(long)]
        server_key: PathBuf,
        #[arg(long)]
        envelope: PathBuf,
        #[arg(long)]
        canonical_version: String,
        #[arg(long)]
        canonical_variant: String,
        #[arg(long)]
        canonical_merkle_root: String,
        #[arg(long)]
        canonical_signer_fingerprint: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Fingerprint {
            classes_root,
            output_dir,
            version,
            variant,
            digest,
            signer_fingerprint,
        } => cmd_fingerprint(classes_root, output_dir, version, variant, digest, signer_fingerprint),
        Cmd::Keygen { parameter_set, output } => cmd_keygen(parameter_set, output),
        Cmd::Seal {
            recipient_public_key,
            merkle_root,
            version,
            variant,
            signer_fingerprint,
            output,
        } => cmd_seal(recipient_public_key, merkle_root, version, variant, signer_fingerprint, output),
        Cmd::Verify {
            server_key,
            envelope,
            canonical_version,
            canonical_variant,
            canonical_merkle_root,
            canonical_signer_fingerprint,
        } => cmd_verify(
            server_key,
            envelope,
            canonical_version,
            canonical_variant,
            canonical_merkle_root,
            canonical_signer_fingerprint,
        ),
    }
}

fn cmd_fingerprint(
    classes_root: PathBuf,
    output_dir: PathBuf,
    version: String,
    variant: String,
    digest: String,
    signer_fingerprint: Option<String>,
) -> Result<()> {
    let algorithm = DigestAlgorithm::parse(&digest).context("unsupported digest algorithm")?;
    let config = Config::default();
    let result = fingerprint::fingerprint(fingerprint::FingerprintRequest {
        classes_root: &classes_root,
        variant: &variant,
        version: &version,
        algorithm,
        signer_fingerprint_hex: signer_fingerprint,
        exclude_patterns: config.merkle.exclude_patterns,
        output_dir: &output_dir,
    })?;

    println!("merkle root : {}", result.merkle_root_hex);
    println!("leaf count  : {}", result.leaf_count);
    println!("wrote       : {}", output_dir.display());
    Ok(())
}

fn default_key_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".anchorpq").join("server.kemkey"))
}

fn cmd_keygen(parameter_set: String, output: Option<PathBuf>) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None => default_key_path()?,
    };
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let ps = ParameterSet::parse(&parameter_set).unwrap_or_else(|| {
        eprintln!("warning: unknown parameter set '{parameter_set}', falling back to default");
        ParameterSet::default()
    });
    let keypair = kem::generate_keypair(ps);
    kem::persist(&keypair, &output)?;

    let exported = kem::export_public(keypair.parameter_set, &keypair.public_key_bytes);
    let public_key_path = output.with_extension("pub");
    std::fs::write(&public_key_path, &exported)?;

    let response = PublicKeyResponse {
        public_key_b64: general_purpose::STANDARD.encode(&exported),
        parameter_set: keypair.parameter_set.wire_name().to_string(),
        algorithm: "ML-KEM".to_string(),
        generated_at_ms: keypair.generated_at.timestamp_millis(),
        key_id: keypair.key_id.to_string(),
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    println!("wrote public key -> {}", public_key_path.display());
    println!(
        "persisted        -> {} ({})",
        output.display(),
        format_size(std::fs::metadata(&output)?.len(), BINARY)
    );
    Ok(())
}

fn cmd_seal(
    recipient_public_key: PathBuf,
    merkle_root: String,
    version: String,
    variant: String,
    signer_fingerprint: String,
    output: PathBuf,
) -> Result<()> {
    let exported = std::fs::read(&recipient_public_key).context("reading recipient public key")?;
    let (parameter_set, public_key_bytes) = kem::import_public(&exported)?;

    let payload = IntegrityPayload {
        merkle_root_hex: merkle_root,
        version,
        variant,
        signer_fingerprint_hex: signer_fingerprint,
    };
    let plaintext = serde_json::to_vec(&payload)?;

    let env = envelope::seal_for(parameter_set, &public_key_bytes, &plaintext)?;
    std::fs::write(&output, env.to_bytes())?;
    println!("sealed -> {}", output.display());
    Ok(())
}

fn cmd_verify(
    server_key: PathBuf,
    envelope_path: PathBuf,
    canonical_version: String,
    canonical_variant: String,
    canonical_merkle_root: String,
    canonical_signer_fingerprint: String,
) -> Result<()> {
    let keypair = kem::load(&server_key).context("loading server keypair")?;
    let bytes = std::fs::read(&envelope_path).context("reading envelope")?;
    let env = envelope::Envelope::from_bytes(keypair.parameter_set, &bytes)?;

    let repository = InMemoryRepository::new();
    let now = chrono::Utc::now();
    repository.save_or_update(CanonicalRecord {
        version: canonical_version,
        variant: canonical_variant,
        merkle_root_hex: canonical_merkle_root,
        signer_fingerprint_hex: canonical_signer_fingerprint,
        description: None,
        active: true,
        created_at: now,
        updated_at: now,
    });

    let decision = verify::verify_envelope(&env, keypair.private_key_bytes(), &repository);
    let timestamp_ms = verify::decision_timestamp_ms();
    let response = anchorpq_core::wire::VerificationResponse::from_decision(&decision, timestamp_ms);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
