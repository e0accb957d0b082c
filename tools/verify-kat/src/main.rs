//! Standalone known-answer-test checker for the two deterministic primitives
//! under the hybrid envelope: HKDF-SHA3-256 derivation and AES-256-GCM
//! seal/open (§4.C). Takes no dependency on `anchorpq-core` so a KAT file can
//! be checked against a reference vector set without building the whole
//! workspace.

use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use serde::Deserialize;
use sha3::Sha3_256;

#[derive(Deserialize)]
struct Kat {
    kdf: KdfKat,
    aead: AeadKat,
}

#[derive(Deserialize)]
struct KdfKat {
    shared_secret_hex: String,
    salt_hex: Option<String>,
    info: String,
    expected_key_hex: String,
}

#[derive(Deserialize)]
struct AeadKat {
    key_hex: String,
    iv_hex: String,
    plaintext_hex: String,
    expected_sealed_hex: String,
}

fn hex_to<const N: usize>(s: &str) -> anyhow::Result<[u8; N]> {
    let v = hex::decode(s)?;
    anyhow::ensure!(v.len() == N, "expected {N} bytes, got {}", v.len());
    let mut out = [0u8; N];
    out.copy_from_slice(&v);
    Ok(out)
}

fn check_kdf(kat: &KdfKat) -> anyhow::Result<()> {
    let shared_secret = hex::decode(&kat.shared_secret_hex)?;
    let salt = kat.salt_hex.as_ref().map(|s| hex::decode(s)).transpose()?;
    let mut okm = [0u8; 32];
    // A missing salt means the extract phase is skipped entirely (the shared
    // secret is used directly as the pseudo-random key) — `Hkdf::new(None, ..)`
    // would instead run HMAC-extract under an implicit zero salt, which is a
    // different key.
    match salt {
        Some(salt) => {
            let hk = Hkdf::<Sha3_256>::new(Some(&salt), &shared_secret);
            hk.expand(kat.info.as_bytes(), &mut okm)
                .map_err(|_| anyhow::anyhow!("hkdf expand failed"))?;
        }
        None => {
            let hk = Hkdf::<Sha3_256>::from_prk(&shared_secret)
                .map_err(|_| anyhow::anyhow!("shared secret too short to use as a PRK"))?;
            hk.expand(kat.info.as_bytes(), &mut okm)
                .map_err(|_| anyhow::anyhow!("hkdf expand failed"))?;
        }
    }

    let expected = hex_to::<32>(&kat.expected_key_hex)?;
    anyhow::ensure!(okm == expected, "derived key mismatch");
    Ok(())
}

fn check_aead(kat: &AeadKat) -> anyhow::Result<()> {
    let key = hex_to::<32>(&kat.key_hex)?;
    let iv = hex_to::<12>(&kat.iv_hex)?;
    let plaintext = hex::decode(&kat.plaintext_hex)?;
    let expected_sealed = hex::decode(&kat.expected_sealed_hex)?;

    let cipher = Aes256Gcm::new_from_slice(&key)?;
    let nonce = Nonce::from_slice(&iv);
    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: &plaintext, aad: b"" })
        .map_err(|_| anyhow::anyhow!("seal failed"))?;

    let mut sealed = Vec::with_capacity(iv.len() + ciphertext.len());
    sealed.extend_from_slice(&iv);
    sealed.extend_from_slice(&ciphertext);

    anyhow::ensure!(sealed == expected_sealed, "sealed bytes mismatch");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).expect("usage: verify-kat <file.json>");
    let data = std::fs::read_to_string(path)?;
    let kat: Kat = serde_json::from_str(&data)?;

    check_kdf(&kat.kdf)?;
    check_aead(&kat.aead)?;

    println!("KAT OK");
    Ok(())
}
