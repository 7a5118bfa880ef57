//! A single tracked file's state within a snapshot.

use serde::{Deserialize, Serialize};

use crate::hash::Digest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: uuid::Uuid,
    /// Forward-slash path relative to the repository root.
    pub path: String,
    pub digest: Digest,
    pub size: u64,
    pub modified_at: chrono::DateTime<chrono::Utc>,
    pub deleted: bool,
}

impl FileRecord {
    pub fn new(path: String, digest: Digest, size: u64, modified_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self { id: uuid::Uuid::new_v4(), path, digest, size, modified_at, deleted: false }
    }

    pub fn deletion(path: String, algorithm: crate::hash::HashAlgorithm, modified_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self { id: uuid::Uuid::new_v4(), path, digest: Digest::zero(algorithm), size: 0, modified_at, deleted: true }
    }
}
