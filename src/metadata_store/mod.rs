//! Transactional persistence of commits, branches, snapshots, file records,
//! line changes, remotes, AI activity, and conflicts, over an embedded
//! SQLite database via `sea-orm`. `MetadataStore` is the async contract;
//! `Repository`'s blocking façade drives it through a small current-thread
//! `tokio::runtime::Runtime`.

pub mod entities;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AiActivity, Branch, Commit, Conflict, LineChange, Remote};
use crate::errors::Result;

pub use sqlite::SqliteMetadataStore;

#[derive(Debug, Default, Clone)]
pub struct StoreStatistics {
    pub commits: u64,
    pub branches: u64,
    pub line_changes: u64,
    pub remotes: u64,
    pub conflicts: u64,
}

/// The durable persistence contract `GraphService` depends on. Every
/// mutating operation is atomic with respect to concurrent readers.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn save_commit(&self, commit: &Commit) -> Result<()>;
    async fn get_commit(&self, id: uuid::Uuid) -> Result<Option<Commit>>;
    async fn get_commit_by_digest(&self, digest: &crate::hash::Digest) -> Result<Option<Commit>>;
    async fn commit_exists(&self, digest: &crate::hash::Digest) -> Result<bool>;
    async fn list_commits(&self) -> Result<Vec<Commit>>;
    async fn commits_by_author(&self, name: &str) -> Result<Vec<Commit>>;
    async fn commits_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Commit>>;

    async fn save_branch(&self, branch: &Branch) -> Result<()>;
    async fn get_branch(&self, name: &str) -> Result<Option<Branch>>;
    async fn list_branches(&self) -> Result<Vec<Branch>>;
    async fn delete_branch(&self, name: &str) -> Result<()>;

    async fn batch_save_line_changes(&self, changes: &[LineChange]) -> Result<()>;
    async fn line_changes_by_commit(&self, commit_id: uuid::Uuid) -> Result<Vec<LineChange>>;

    async fn save_remote(&self, remote: &Remote) -> Result<()>;
    async fn get_remote(&self, name: &str) -> Result<Option<Remote>>;
    async fn list_remotes(&self) -> Result<Vec<Remote>>;
    async fn delete_remote(&self, name: &str) -> Result<()>;

    async fn save_ai_activity(&self, activity: &AiActivity) -> Result<()>;
    async fn ai_activity_by_commit(&self, commit_id: uuid::Uuid) -> Result<Vec<AiActivity>>;
    async fn recent_ai_activity(&self, limit: u64) -> Result<Vec<AiActivity>>;

    async fn save_conflict(&self, conflict: &Conflict) -> Result<()>;
    async fn list_unresolved_conflicts(&self) -> Result<Vec<Conflict>>;
    async fn resolve_conflict(&self, id: uuid::Uuid, resolved_text: &str) -> Result<()>;

    async fn statistics(&self) -> Result<StoreStatistics>;
}
