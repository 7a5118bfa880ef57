//! Deterministic digests over composite domain values: a `Snapshot`'s content
//! (the Merkle-style hash over its sorted file-record triples) and a
//! `Commit`'s identity (message, author, timestamp, snapshot digest, sorted
//! parent digests). Both are built by hashing a canonical byte encoding
//! rather than relying on struct field order, so serialization changes never
//! change an object's identity.

use crate::hash::{Digest, Hasher};

const FIELD_SEP: u8 = 0x1f; // unit separator
const RECORD_SEP: u8 = 0x1e; // record separator

/// One row contributing to a snapshot's Merkle digest.
pub struct SnapshotEntry<'a> {
    pub path: &'a str,
    pub digest: &'a Digest,
    pub deleted: bool,
}

/// Hashes `(path, content digest, deleted flag)` triples sorted by path, per
/// the snapshot identity rule: reordering file records never changes the
/// snapshot digest.
pub fn snapshot_digest(hasher: Hasher, entries: &[SnapshotEntry<'_>]) -> Digest {
    let mut sorted: Vec<&SnapshotEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(b.path));

    let mut buf = Vec::new();
    for entry in sorted {
        buf.extend_from_slice(entry.path.as_bytes());
        buf.push(FIELD_SEP);
        buf.extend_from_slice(entry.digest.to_hex().as_bytes());
        buf.push(FIELD_SEP);
        buf.push(entry.deleted as u8);
        buf.push(RECORD_SEP);
    }
    hasher.hash_bytes(&buf)
}

/// Hashes `(message, author name, author email, timestamp, snapshot digest,
/// sorted parent digests)` into a commit's identity.
pub fn commit_digest(
    hasher: Hasher,
    message: &str,
    author_name: &str,
    author_email: &str,
    timestamp_unix: i64,
    snapshot_digest: &Digest,
    parent_digests: &[Digest],
) -> Digest {
    let mut parents: Vec<String> = parent_digests.iter().map(Digest::to_hex).collect();
    parents.sort();

    let mut buf = Vec::new();
    buf.extend_from_slice(message.as_bytes());
    buf.push(FIELD_SEP);
    buf.extend_from_slice(author_name.as_bytes());
    buf.push(FIELD_SEP);
    buf.extend_from_slice(author_email.as_bytes());
    buf.push(FIELD_SEP);
    buf.extend_from_slice(timestamp_unix.to_string().as_bytes());
    buf.push(FIELD_SEP);
    buf.extend_from_slice(snapshot_digest.to_hex().as_bytes());
    for parent in parents {
        buf.push(FIELD_SEP);
        buf.extend_from_slice(parent.as_bytes());
    }
    hasher.hash_bytes(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;

    fn hasher() -> Hasher {
        Hasher::new(HashAlgorithm::Sha256)
    }

    #[test]
    fn snapshot_digest_is_order_independent() {
        let h = hasher();
        let d1 = h.hash_text("one");
        let d2 = h.hash_text("two");
        let a = [
            SnapshotEntry { path: "a.txt", digest: &d1, deleted: false },
            SnapshotEntry { path: "b.txt", digest: &d2, deleted: false },
        ];
        let b = [
            SnapshotEntry { path: "b.txt", digest: &d2, deleted: false },
            SnapshotEntry { path: "a.txt", digest: &d1, deleted: false },
        ];
        assert_eq!(snapshot_digest(h, &a), snapshot_digest(h, &b));
    }

    #[test]
    fn snapshot_digest_reflects_deleted_flag() {
        let h = hasher();
        let d1 = h.hash_text("content");
        let live = [SnapshotEntry { path: "a.txt", digest: &d1, deleted: false }];
        let deleted = [SnapshotEntry { path: "a.txt", digest: &d1, deleted: true }];
        assert_ne!(snapshot_digest(h, &live), snapshot_digest(h, &deleted));
    }

    #[test]
    fn commit_digest_is_parent_order_independent() {
        let h = hasher();
        let snap = h.hash_text("snapshot");
        let p1 = h.hash_text("parent1");
        let p2 = h.hash_text("parent2");
        let d1 = commit_digest(h, "msg", "a", "a@example.com", 1000, &snap, &[p1.clone(), p2.clone()]);
        let d2 = commit_digest(h, "msg", "a", "a@example.com", 1000, &snap, &[p2, p1]);
        assert_eq!(d1, d2);
    }

    #[test]
    fn commit_digest_changes_with_message() {
        let h = hasher();
        let snap = h.hash_text("snapshot");
        let d1 = commit_digest(h, "one", "a", "a@example.com", 1000, &snap, &[]);
        let d2 = commit_digest(h, "two", "a", "a@example.com", 1000, &snap, &[]);
        assert_ne!(d1, d2);
    }
}
