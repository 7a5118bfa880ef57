//! A snapshot is the set of file records owned by exactly one commit. Its
//! digest is a Merkle hash over `(path, digest, deleted)` triples sorted by
//! path, so reordering records never changes identity.

use serde::{Deserialize, Serialize};

use crate::domain::file_record::FileRecord;
use crate::hash::{Digest, Hasher};
use crate::merkle::{self, SnapshotEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub files: Vec<FileRecord>,
    pub digest: Digest,
}

impl Snapshot {
    pub fn new(hasher: Hasher, timestamp: chrono::DateTime<chrono::Utc>, files: Vec<FileRecord>) -> Self {
        let entries: Vec<SnapshotEntry> = files
            .iter()
            .map(|f| SnapshotEntry { path: &f.path, digest: &f.digest, deleted: f.deleted })
            .collect();
        let digest = merkle::snapshot_digest(hasher, &entries);
        Self { id: uuid::Uuid::new_v4(), timestamp, files, digest }
    }

    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;

    #[test]
    fn digest_matches_sorted_record_hash() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        let now = chrono::Utc::now();
        let files = vec![
            FileRecord::new("b.txt".into(), hasher.hash_text("b"), 1, now),
            FileRecord::new("a.txt".into(), hasher.hash_text("a"), 1, now),
        ];
        let snapshot = Snapshot::new(hasher, now, files.clone());

        let mut reordered = files;
        reordered.reverse();
        let other = Snapshot::new(hasher, now, reordered);
        assert_eq!(snapshot.digest, other.digest);
    }
}
