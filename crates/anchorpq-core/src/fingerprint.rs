//! Component B: build-time fingerprinting of a compiled classes tree.
//!
//! Reduces a directory of compiled `.class` artifacts to a single Merkle
//! root and writes companion metadata (§4.B, §6). This module never reads
//! timestamps, salts, or random values into the root — the only inputs to
//! the hash are file contents and their relative path ordering.

use crate::error::FingerprintError;
use crate::merkle::{hash, DigestAlgorithm, Leaf, MerkleTree};
use crate::security::set_secure_permissions;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default exclusion rules from §4.B, applied in addition to any
/// user-configured patterns (see `config::Config::merkle_exclude_patterns`).
pub fn default_exclusions() -> Vec<String> {
    vec![
        "R.class".to_string(),
        "R$*.class".to_string(),
        "BuildConfig.class".to_string(),
        "*$$*.class".to_string(),
        "*_Factory.class".to_string(),
        "*_MembersInjector.class".to_string(),
        "Hilt_*.class".to_string(),
    ]
}

/// Very small glob matcher supporting only the `*` wildcard, sufficient for
/// the fixed exclusion patterns in §4.B (no directory separators involved).
fn glob_match(pattern: &str, name: &str) -> bool {
    fn inner(p: &[u8], s: &[u8]) -> bool {
        match (p.first(), s.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                // Try consuming zero or more characters of `s`.
                (0..=s.len()).any(|i| inner(&p[1..], &s[i..]))
            }
            (Some(pc), Some(sc)) if pc == sc => inner(&p[1..], &s[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), name.as_bytes())
}

fn is_excluded(file_name: &str, full_path: &str, patterns: &[String]) -> bool {
    if full_path.split(['/', '\\']).any(|seg| seg == "META-INF") {
        return true;
    }
    if full_path.ends_with(".dex") {
        return true;
    }
    patterns.iter().any(|pat| glob_match(pat, file_name))
}

fn visit_dirs(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            visit_dirs(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Reduces `classes_root` to a sorted list of retained `.class` files: files
/// ending in `.class` that do not match an exclusion pattern, sorted
/// lexicographically by their path string relative to `classes_root`
/// (stable, locale-independent byte order).
pub fn collect_retained_files(
    classes_root: &Path,
    exclude_patterns: &[String],
) -> Result<Vec<(String, PathBuf)>, FingerprintError> {
    if !classes_root.is_dir() {
        return Err(FingerprintError::InputDirectoryMissing(
            classes_root.display().to_string(),
        ));
    }

    let mut all = Vec::new();
    visit_dirs(classes_root, &mut all).map_err(|source| FingerprintError::ReadFailure {
        path: classes_root.display().to_string(),
        source,
    })?;

    let mut retained: Vec<(String, PathBuf)> = all
        .into_iter()
        .filter_map(|path| {
            let file_name = path.file_name()?.to_str()?.to_string();
            if !file_name.ends_with(".class") {
                return None;
            }
            let rel = path.strip_prefix(classes_root).ok()?;
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if is_excluded(&file_name, &rel_str, exclude_patterns) {
                return None;
            }
            Some((rel_str, path))
        })
        .collect();

    retained.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    Ok(retained)
}

/// Plugin identity recorded in integrity metadata (§3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub plugin_version: String,
}

/// `{version, variant, digest_algorithm, merkle_root_hex, timestamp,
/// leaf_count, optional signer_fingerprint_hex, plugin_info}` from §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityMetadata {
    pub version: String,
    pub variant: String,
    pub digest_algorithm: String,
    pub merkle_root_hex: String,
    pub timestamp: String,
    pub leaf_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_fingerprint_hex: Option<String>,
    pub plugin_info: PluginInfo,
}

impl IntegrityMetadata {
    pub fn to_json(&self) -> Result<String, FingerprintError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FingerprintError::OutputWriteFailure(e.to_string()))
    }

    /// XML rendering with identical element names/values to the JSON form
    /// (§6: "a parallel XML rendering with identical element names and
    /// values"). Hand-rendered: this crate emits XML, it never parses it.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<integrityMetadata>\n");
        out.push_str(&format!("  <version>{}</version>\n", xml_escape(&self.version)));
        out.push_str(&format!("  <variant>{}</variant>\n", xml_escape(&self.variant)));
        out.push_str(&format!(
            "  <hashAlgorithm>{}</hashAlgorithm>\n",
            xml_escape(&self.digest_algorithm)
        ));
        out.push_str(&format!(
            "  <merkleRoot>{}</merkleRoot>\n",
            xml_escape(&self.merkle_root_hex)
        ));
        out.push_str(&format!("  <timestamp>{}</timestamp>\n", xml_escape(&self.timestamp)));
        out.push_str(&format!("  <leafCount>{}</leafCount>\n", self.leaf_count));
        if let Some(fpr) = &self.signer_fingerprint_hex {
            out.push_str(&format!("  <signerFingerprint>{}</signerFingerprint>\n", xml_escape(fpr)));
        }
        out.push_str("  <plugin>\n");
        out.push_str(&format!("    <name>{}</name>\n", xml_escape(&self.plugin_info.name)));
        out.push_str(&format!(
            "    <pluginVersion>{}</pluginVersion>\n",
            xml_escape(&self.plugin_info.plugin_version)
        ));
        out.push_str("  </plugin>\n");
        out.push_str("</integrityMetadata>\n");
        out
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub struct FingerprintRequest<'a> {
    pub classes_root: &'a Path,
    pub variant: &'a str,
    pub version: &'a str,
    pub algorithm: DigestAlgorithm,
    pub signer_fingerprint_hex: Option<String>,
    pub exclude_patterns: Vec<String>,
    pub output_dir: &'a Path,
}

pub struct FingerprintOutput {
    pub merkle_root_hex: String,
    pub leaf_count: usize,
    pub metadata: IntegrityMetadata,
}

/// Runs the full §4.B algorithm: enumerate, filter, sort, hash, build tree,
/// write `merkle-root.txt` plus JSON/XML metadata into `output_dir`.
pub fn fingerprint(req: FingerprintRequest<'_>) -> Result<FingerprintOutput, FingerprintError> {
    let retained = collect_retained_files(req.classes_root, &req.exclude_patterns)?;
    if retained.is_empty() {
        return Err(FingerprintError::NoInputs);
    }

    let mut leaves = Vec::with_capacity(retained.len());
    for (rel_path, abs_path) in &retained {
        let bytes = std::fs::read(abs_path).map_err(|source| FingerprintError::ReadFailure {
            path: abs_path.display().to_string(),
            source,
        })?;
        leaves.push(Leaf {
            relative_path: rel_path.clone(),
            content_hash: hash(&bytes, req.algorithm),
        });
    }

    let leaf_hashes = leaves.into_iter().map(|l| l.content_hash).collect::<Vec<_>>();
    let leaf_count = leaf_hashes.len();
    let tree = MerkleTree::new(leaf_hashes, req.algorithm)?;
    let merkle_root_hex = tree.root_hex();

    let metadata = IntegrityMetadata {
        version: req.version.to_string(),
        variant: req.variant.to_string(),
        digest_algorithm: req.algorithm.as_str().to_string(),
        merkle_root_hex: merkle_root_hex.clone(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        leaf_count,
        signer_fingerprint_hex: req.signer_fingerprint_hex,
        plugin_info: PluginInfo {
            name: "anchorpq-fingerprinter".to_string(),
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    write_outputs(req.output_dir, &merkle_root_hex, &metadata)?;

    Ok(FingerprintOutput {
        merkle_root_hex,
        leaf_count,
        metadata,
    })
}

fn write_outputs(
    output_dir: &Path,
    merkle_root_hex: &str,
    metadata: &IntegrityMetadata,
) -> Result<(), FingerprintError> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| FingerprintError::OutputWriteFailure(e.to_string()))?;

    let root_path = output_dir.join("merkle-root.txt");
    std::fs::write(&root_path, format!("{merkle_root_hex}\n"))
        .map_err(|e| FingerprintError::OutputWriteFailure(e.to_string()))?;
    set_secure_permissions(&root_path).ok();

    let json_path = output_dir.join("integrity-metadata.json");
    std::fs::write(&json_path, metadata.to_json()?)
        .map_err(|e| FingerprintError::OutputWriteFailure(e.to_string()))?;

    let xml_path = output_dir.join("integrity-metadata.xml");
    std::fs::write(&xml_path, metadata.to_xml())
        .map_err(|e| FingerprintError::OutputWriteFailure(e.to_string()))?;

    Ok(())
}
