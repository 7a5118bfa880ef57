//! Hashed, line-granular change records derived from a diff. Purely derived
//! data: never hand-edited, always rebuildable from blob content.

use serde::{Deserialize, Serialize};

use crate::hash::Digest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineChange {
    pub id: uuid::Uuid,
    /// 1-based; post-change coordinate for Added/Modified, pre-change for Deleted.
    pub line_number: usize,
    pub old_digest: Option<Digest>,
    pub new_digest: Option<Digest>,
    pub kind: ChangeKind,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub commit_id: Option<uuid::Uuid>,
}

impl LineChange {
    pub fn added(line_number: usize, new_digest: Digest, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            line_number,
            old_digest: None,
            new_digest: Some(new_digest),
            kind: ChangeKind::Added,
            timestamp,
            commit_id: None,
        }
    }

    pub fn deleted(line_number: usize, old_digest: Digest, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            line_number,
            old_digest: Some(old_digest),
            new_digest: None,
            kind: ChangeKind::Deleted,
            timestamp,
            commit_id: None,
        }
    }

    pub fn modified(line_number: usize, old_digest: Digest, new_digest: Digest, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            line_number,
            old_digest: Some(old_digest),
            new_digest: Some(new_digest),
            kind: ChangeKind::Modified,
            timestamp,
            commit_id: None,
        }
    }
}
