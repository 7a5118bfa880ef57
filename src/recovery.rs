//! Branch-movement reflog and dangling-commit recovery. The reflog is an
//! append-only, tab-separated file per branch under `.linage/logs/`; dangling
//! discovery is a plain BFS from every branch head through parent digests.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::domain::{Branch, Commit};
use crate::errors::Result;
use crate::graph_service::GraphService;

pub struct RecoveryManager {
    logs_dir: PathBuf,
}

impl RecoveryManager {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Result<Self> {
        let logs_dir = logs_dir.into();
        std::fs::create_dir_all(&logs_dir)?;
        Ok(Self { logs_dir })
    }

    fn log_path(&self, branch: &str) -> PathBuf {
        self.logs_dir.join(format!("{branch}.log"))
    }

    /// Appends `<timestamp>\t<old|null>\t<new>\t<action>\n` to the branch's log.
    fn append_entry(&self, branch: &str, old: Option<&str>, new: &str, action: &str) -> Result<()> {
        let line = format!(
            "{}\t{}\t{}\t{}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            old.unwrap_or("null"),
            new,
            action,
        );
        let mut file = OpenOptions::new().create(true).append(true).open(self.log_path(branch))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Moves `branch`'s head to `target`, logging the move.
    pub async fn rollback_branch(&self, graph: &mut GraphService, branch: &str, target: &Commit) -> Result<()> {
        let previous_head = graph.get_branch(branch).and_then(|b| b.head.clone()).map(|d| d.to_hex());
        graph.set_branch_head(branch, target.digest.clone()).await?;
        self.append_entry(branch, previous_head.as_deref(), &target.digest.to_hex(), "rollback")?;
        info!(branch, target = %target.digest, "branch rolled back");
        Ok(())
    }

    /// Commits not reachable via parent traversal from any branch head.
    pub fn find_dangling(&self, graph: &GraphService) -> Vec<Commit> {
        let mut reachable: HashSet<uuid::Uuid> = HashSet::new();
        for branch in graph.list_branches() {
            if let Some(head) = &branch.head {
                for id in graph.ancestor_ids_public(head) {
                    reachable.insert(id);
                }
            }
        }
        graph
            .all_commits()
            .into_iter()
            .filter(|c| !reachable.contains(&c.id))
            .collect()
    }

    /// Creates a new, inactive branch at `commit_id` and logs the recovery.
    pub async fn recover(&self, graph: &mut GraphService, commit_id: uuid::Uuid, new_branch_name: &str) -> Result<Branch> {
        let commit = graph
            .commit_by_id(commit_id)
            .ok_or_else(|| crate::errors::LinageError::NotFound(format!("commit {commit_id}")))?
            .clone();
        let branch = graph.create_detached_branch(new_branch_name, commit.digest.clone()).await?;
        self.append_entry(new_branch_name, None, &commit.digest.to_hex(), "recover")?;
        info!(branch = new_branch_name, commit = %commit.digest, "dangling commit recovered");
        Ok(branch)
    }

    /// Reads back the reflog entries for `branch` in file order.
    pub fn read_log(&self, branch: &str) -> Result<Vec<String>> {
        let path = self.log_path(branch);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(text.lines().map(str::to_string).collect())
    }
}

pub fn default_logs_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(".linage").join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashAlgorithm, Hasher};
    use crate::metadata_store::sqlite::SqliteMetadataStore;
    use crate::metadata_store::MetadataStore;
    use crate::domain::Snapshot;
    use std::sync::Arc;

    fn commit(hasher: Hasher, message: &str, parents: Vec<crate::hash::Digest>) -> Commit {
        let snapshot = Snapshot::new(hasher, Utc::now(), vec![]);
        Commit::new(hasher, message, "Ada", "ada@example.com", Utc::now(), parents, snapshot, false)
    }

    async fn graph() -> GraphService {
        let store: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::connect("sqlite::memory:").await.unwrap());
        GraphService::hydrate(store, Hasher::new(HashAlgorithm::Sha256)).await.unwrap()
    }

    #[tokio::test]
    async fn find_dangling_detects_commits_after_branch_deletion() {
        let mut graph = graph().await;
        graph.create_branch("main").await.unwrap();
        graph.switch_branch("main").await.unwrap();
        graph.create_branch("dev").await.unwrap();
        graph.switch_branch("dev").await.unwrap();

        let hasher = graph.hasher();
        let c1 = commit(hasher, "c1", vec![]);
        graph.add_commit(c1.clone()).await.unwrap();
        let c2 = commit(hasher, "c2", vec![c1.digest.clone()]);
        graph.add_commit(c2.clone()).await.unwrap();

        graph.switch_branch("main").await.unwrap();
        graph.delete_branch("dev").await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let manager = RecoveryManager::new(dir.path()).unwrap();
        let dangling = manager.find_dangling(&graph);
        let dangling_ids: HashSet<uuid::Uuid> = dangling.iter().map(|c| c.id).collect();
        assert!(dangling_ids.contains(&c1.id));
        assert!(dangling_ids.contains(&c2.id));
    }

    #[tokio::test]
    async fn recover_creates_inactive_branch_and_logs_entry() {
        let mut graph = graph().await;
        graph.create_branch("dev").await.unwrap();
        graph.switch_branch("dev").await.unwrap();
        let hasher = graph.hasher();
        let c1 = commit(hasher, "c1", vec![]);
        graph.add_commit(c1.clone()).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let manager = RecoveryManager::new(dir.path()).unwrap();
        let rescued = manager.recover(&mut graph, c1.id, "rescue").await.unwrap();
        assert!(!rescued.is_active);
        assert_eq!(rescued.head, Some(c1.digest));

        let log = manager.read_log("rescue").unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].ends_with("recover"));
    }

    #[tokio::test]
    async fn rollback_branch_moves_head_and_logs_entry() {
        let mut graph = graph().await;
        graph.create_branch("main").await.unwrap();
        graph.switch_branch("main").await.unwrap();
        let hasher = graph.hasher();
        let c1 = commit(hasher, "c1", vec![]);
        graph.add_commit(c1.clone()).await.unwrap();
        let c2 = commit(hasher, "c2", vec![c1.digest.clone()]);
        graph.add_commit(c2).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let manager = RecoveryManager::new(dir.path()).unwrap();
        manager.rollback_branch(&mut graph, "main", &c1).await.unwrap();

        assert_eq!(graph.get_branch("main").unwrap().head, Some(c1.digest));
        let log = manager.read_log("main").unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].ends_with("rollback"));
    }
}
