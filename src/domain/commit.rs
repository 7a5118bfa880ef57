//! A commit records a snapshot of the working tree at a point in time,
//! referencing zero (root), one (linear), or many (merge) parents. Its
//! digest is fixed at construction: change any field and you get a new
//! commit, never a mutated one.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::domain::snapshot::Snapshot;
use crate::hash::{Digest, Hasher};
use crate::merkle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: uuid::Uuid,
    pub digest: Digest,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub parent_digests: Vec<Digest>,
    pub snapshot: Snapshot,
    pub ai_assisted: bool,
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}
impl Eq for Commit {}

impl Display for Commit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "commit {}", self.digest)?;
        for parent in &self.parent_digests {
            writeln!(f, "parent {parent}")?;
        }
        writeln!(f, "Author: {} <{}>", self.author_name, self.author_email)?;
        writeln!(f, "Date:   {}", self.timestamp)?;
        writeln!(f)?;
        writeln!(f, "    {}", self.message)
    }
}

impl Commit {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hasher: Hasher,
        message: impl Into<String>,
        author_name: impl Into<String>,
        author_email: impl Into<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
        parent_digests: Vec<Digest>,
        snapshot: Snapshot,
        ai_assisted: bool,
    ) -> Self {
        let message = message.into();
        let author_name = author_name.into();
        let author_email = author_email.into();

        let digest = merkle::commit_digest(
            hasher,
            &message,
            &author_name,
            &author_email,
            timestamp.timestamp(),
            &snapshot.digest,
            &parent_digests,
        );

        Self {
            id: uuid::Uuid::new_v4(),
            digest,
            message,
            author_name,
            author_email,
            timestamp,
            parent_digests,
            snapshot,
            ai_assisted,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_digests.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_digests.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;

    fn snapshot(hasher: Hasher) -> Snapshot {
        Snapshot::new(hasher, chrono::Utc::now(), vec![])
    }

    #[test]
    fn digest_is_stable_for_identical_inputs() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        let ts = chrono::Utc::now();
        let snap = snapshot(hasher);
        let c1 = Commit::new(hasher, "init", "a", "a@example.com", ts, vec![], snap.clone(), false);
        let c2 = Commit::new(hasher, "init", "a", "a@example.com", ts, vec![], snap, false);
        assert_eq!(c1.digest, c2.digest);
    }

    #[test]
    fn root_commit_has_no_parents() {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        let commit = Commit::new(hasher, "init", "a", "a@example.com", chrono::Utc::now(), vec![], snapshot(hasher), false);
        assert!(commit.is_root());
        assert!(!commit.is_merge());
    }
}
