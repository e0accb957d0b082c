//! Canonical Record Repository (§6): the interface the Verification Core
//! consumes, plus an in-memory reference implementation for tests and demos.
//! Durable storage, caching and concurrency control are explicitly out of
//! scope for the core (§1) — a real deployment supplies its own impl.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub version: String,
    pub variant: String,
    pub merkle_root_hex: String,
    pub signer_fingerprint_hex: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `find_active`/`save_or_update`/`deactivate` exactly as named in §6. The
/// core requires linearizable reads against its own writes; it makes no
/// further assumption about the backend.
pub trait CanonicalRecordRepository: Send + Sync {
    fn find_active(&self, version: &str, variant: &str) -> Option<CanonicalRecord>;
    fn save_or_update(&self, record: CanonicalRecord) -> CanonicalRecord;
    fn deactivate(&self, version: &str, variant: &str);
}

/// A process-local reference implementation backed by a `RwLock<HashMap>`.
/// Suitable for tests and single-process demos; not durable.
#[derive(Default)]
pub struct InMemoryRepository {
    records: RwLock<HashMap<(String, String), CanonicalRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CanonicalRecordRepository for InMemoryRepository {
    fn find_active(&self, version: &str, variant: &str) -> Option<CanonicalRecord> {
        let key = (version.to_string(), variant.to_string());
        self.records
            .read()
            .expect("repository lock poisoned")
            .get(&key)
            .filter(|r| r.active)
            .cloned()
    }

    fn save_or_update(&self, mut record: CanonicalRecord) -> CanonicalRecord {
        let key = (record.version.clone(), record.variant.clone());
        let mut guard = self.records.write().expect("repository lock poisoned");
        if let Some(existing) = guard.get(&key) {
            record.created_at = existing.created_at;
        }
        record.updated_at = Utc::now();
        guard.insert(key, record.clone());
        record
    }

    fn deactivate(&self, version: &str, variant: &str) {
        let key = (version.to_string(), variant.to_string());
        let mut guard = self.records.write().expect("repository lock poisoned");
        if let Some(record) = guard.get_mut(&key) {
            record.active = false;
            record.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(version: &str, variant: &str) -> CanonicalRecord {
        let now = Utc::now();
        CanonicalRecord {
            version: version.to_string(),
            variant: variant.to_string(),
            merkle_root_hex: "a".repeat(64),
            signer_fingerprint_hex: "b".repeat(64),
            description: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn save_then_find_active_round_trips() {
        let repo = InMemoryRepository::new();
        repo.save_or_update(sample("1.0.0", "release"));
        let found = repo.find_active("1.0.0", "release").unwrap();
        assert_eq!(found.merkle_root_hex, "a".repeat(64));
    }

    #[test]
    fn unknown_key_returns_none() {
        let repo = InMemoryRepository::new();
        assert!(repo.find_active("9.9.9", "release").is_none());
    }

    #[test]
    fn deactivate_hides_record_from_find_active() {
        let repo = InMemoryRepository::new();
        repo.save_or_update(sample("1.0.0", "release"));
        repo.deactivate("1.0.0", "release");
        assert!(repo.find_active("1.0.0", "release").is_none());
    }

    #[test]
    fn save_or_update_preserves_created_at() {
        let repo = InMemoryRepository::new();
        let first = repo.save_or_update(sample("1.0.0", "release"));
        let mut second = sample("1.0.0", "release");
        second.merkle_root_hex = "c".repeat(64);
        let updated = repo.save_or_update(second);
        assert_eq!(updated.created_at, first.created_at);
        assert_eq!(updated.merkle_root_hex, "c".repeat(64));
    }
}
