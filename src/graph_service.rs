//! The commit DAG: branches, head pointers, merge-base discovery, merge
//! orchestration, and rebase replay. Caches are hydrated from the
//! `MetadataStore` on construction and kept coherent by every mutating
//! operation; a persistence failure never leaves the cache diverged from the
//! store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use tracing::{debug, info, warn};

use crate::diff::DiffStrategyKind;
use crate::domain::{Branch, Commit, Conflict, FileRecord};
use crate::errors::{LinageError, Result};
use crate::hash::{Digest, Hasher};
use crate::merge::MergeEngine;
use crate::metadata_store::MetadataStore;
use crate::storage::BlobStore;

pub struct GraphService {
    store: Arc<dyn MetadataStore>,
    hasher: Hasher,
    commits: AHashMap<uuid::Uuid, Commit>,
    digest_index: AHashMap<Digest, uuid::Uuid>,
    branches: HashMap<String, Branch>,
    active_branch: Option<String>,
    history_cache: Option<Vec<uuid::Uuid>>,
}

impl GraphService {
    pub async fn hydrate(store: Arc<dyn MetadataStore>, hasher: Hasher) -> Result<Self> {
        let commit_list = store.list_commits().await?;
        let branch_list = store.list_branches().await?;

        let mut commits = AHashMap::with_capacity(commit_list.len());
        let mut digest_index = AHashMap::with_capacity(commit_list.len());
        for commit in commit_list {
            digest_index.insert(commit.digest.clone(), commit.id);
            commits.insert(commit.id, commit);
        }

        let mut branches = HashMap::with_capacity(branch_list.len());
        let mut active_branch = None;
        for branch in branch_list {
            if branch.is_active {
                active_branch = Some(branch.name.clone());
            }
            branches.insert(branch.name.clone(), branch);
        }

        info!(commits = commits.len(), branches = branches.len(), "graph hydrated");
        Ok(Self { store, hasher, commits, digest_index, branches, active_branch, history_cache: None })
    }

    pub fn hasher(&self) -> Hasher {
        self.hasher
    }

    /// Persists `commit`, advances the active branch's head, and invalidates
    /// the history cache. Rolls the cache back to its prior state if
    /// persistence fails.
    pub async fn add_commit(&mut self, commit: Commit) -> Result<()> {
        if self.commits.contains_key(&commit.id) {
            return Err(LinageError::Conflict(format!("commit {} already present", commit.id)));
        }

        self.store.save_commit(&commit).await?;

        let active_name = self.active_branch.clone();
        if let Some(name) = &active_name {
            let mut branch = self.branches.get(name).cloned().ok_or_else(|| {
                LinageError::Corruption(format!("active branch `{name}` missing from cache"))
            })?;
            branch.head = Some(commit.digest.clone());
            if let Err(e) = self.store.save_branch(&branch).await {
                warn!(branch = %name, error = %e, "rolling back branch head after failed persist");
                return Err(e);
            }
            self.branches.insert(name.clone(), branch);
        }

        debug!(commit = %commit.digest, "commit added");
        self.digest_index.insert(commit.digest.clone(), commit.id);
        self.commits.insert(commit.id, commit);
        self.history_cache = None;
        Ok(())
    }

    pub async fn create_branch(&mut self, name: &str) -> Result<Branch> {
        if name.trim().is_empty() {
            return Err(LinageError::InvalidInput("branch name must not be empty".into()));
        }
        if self.branches.contains_key(name) {
            return Err(LinageError::Conflict(format!("branch `{name}` already exists")));
        }
        if !self.commits.is_empty() && self.active_branch.is_none() {
            return Err(LinageError::Conflict("cannot branch from nothing when history exists".into()));
        }

        let head = match &self.active_branch {
            Some(active) => self.branches.get(active).and_then(|b| b.head.clone()),
            None => None,
        };

        let branch = Branch::new(name, head, false);
        self.store.save_branch(&branch).await?;
        self.branches.insert(name.to_string(), branch.clone());
        info!(branch = name, "branch created");
        Ok(branch)
    }

    pub fn get_branch(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    pub fn list_branches(&self) -> Vec<&Branch> {
        self.branches.values().collect()
    }

    pub fn current_branch(&self) -> Option<&Branch> {
        self.active_branch.as_deref().and_then(|name| self.branches.get(name))
    }

    pub fn commit_by_id(&self, id: uuid::Uuid) -> Option<&Commit> {
        self.commits.get(&id)
    }

    pub fn commit_by_digest(&self, digest: &Digest) -> Option<&Commit> {
        self.digest_index.get(digest).and_then(|id| self.commits.get(id))
    }

    pub fn all_commits(&self) -> Vec<Commit> {
        self.commits.values().cloned().collect()
    }

    /// Ancestors (including `digest` itself) reachable by parent traversal.
    pub fn ancestor_ids_public(&self, digest: &Digest) -> Vec<uuid::Uuid> {
        self.ancestor_ids(digest)
    }

    /// Moves `name`'s head to `target` directly, independent of the active
    /// branch, for `RecoveryManager::rollback_branch`.
    pub async fn set_branch_head(&mut self, name: &str, target: Digest) -> Result<()> {
        let mut branch = self.branches.get(name).cloned().ok_or_else(|| LinageError::NotFound(format!("branch `{name}`")))?;
        branch.head = Some(target);
        self.store.save_branch(&branch).await?;
        self.branches.insert(name.to_string(), branch);
        self.history_cache = None;
        Ok(())
    }

    /// Creates a new, inactive branch pointed at `target`, bypassing the
    /// active-branch-seeding rule `create_branch` applies — used to restore
    /// a dangling commit to reachability.
    pub async fn create_detached_branch(&mut self, name: &str, target: Digest) -> Result<Branch> {
        if self.branches.contains_key(name) {
            return Err(LinageError::Conflict(format!("branch `{name}` already exists")));
        }
        let branch = Branch::new(name, Some(target), false);
        self.store.save_branch(&branch).await?;
        self.branches.insert(name.to_string(), branch.clone());
        Ok(branch)
    }

    pub async fn switch_branch(&mut self, name: &str) -> Result<()> {
        if !self.branches.contains_key(name) {
            return Err(LinageError::NotFound(format!("branch `{name}`")));
        }
        if let Some(previous) = self.active_branch.clone() {
            if previous == name {
                return Ok(());
            }
            if let Some(mut branch) = self.branches.get(&previous).cloned() {
                branch.is_active = false;
                self.store.save_branch(&branch).await?;
                self.branches.insert(previous, branch);
            }
        }
        let mut branch = self.branches.get(name).cloned().unwrap();
        branch.is_active = true;
        self.store.save_branch(&branch).await?;
        self.branches.insert(name.to_string(), branch);
        self.active_branch = Some(name.to_string());
        self.history_cache = None;
        info!(branch = name, "active branch switched");
        Ok(())
    }

    pub async fn delete_branch(&mut self, name: &str) -> Result<()> {
        if self.active_branch.as_deref() == Some(name) {
            return Err(LinageError::Conflict("cannot delete the active branch".into()));
        }
        if !self.branches.contains_key(name) {
            return Err(LinageError::NotFound(format!("branch `{name}`")));
        }
        self.store.delete_branch(name).await?;
        self.branches.remove(name);
        info!(branch = name, "branch deleted");
        Ok(())
    }

    /// Commits reachable from the active branch's head, deduplicated and
    /// ordered by timestamp descending. Cached until invalidated by a
    /// mutating operation.
    pub fn history(&mut self) -> Result<Vec<Commit>> {
        if self.history_cache.is_none() {
            let ids = match self.current_branch().and_then(|b| b.head.clone()) {
                Some(head_digest) => self.ancestor_ids(&head_digest),
                None => Vec::new(),
            };
            self.history_cache = Some(ids);
        }
        let ids = self.history_cache.as_ref().unwrap();
        let mut commits: Vec<Commit> = ids.iter().filter_map(|id| self.commits.get(id).cloned()).collect();
        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(commits)
    }

    fn ancestor_ids(&self, head_digest: &Digest) -> Vec<uuid::Uuid> {
        let Some(&head_id) = self.digest_index.get(head_digest) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([head_id]);
        let mut out = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            if let Some(commit) = self.commits.get(&id) {
                for parent_digest in &commit.parent_digests {
                    if let Some(&parent_id) = self.digest_index.get(parent_digest) {
                        queue.push_back(parent_id);
                    }
                }
            }
        }
        out
    }

    /// BFS over `b`'s ancestors (including `b`) until the first commit also
    /// present in `a`'s ancestor set (including `a`). Multiple lowest common
    /// ancestors break ties by latest timestamp; this is documented BFS
    /// behavior, not a canonical LCA algorithm.
    pub fn find_common_ancestor(&self, a: uuid::Uuid, b: uuid::Uuid) -> Option<uuid::Uuid> {
        let a_ancestors: HashSet<uuid::Uuid> = self.commit_ancestor_ids(a).into_iter().collect();

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([b]);
        let mut candidates = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if a_ancestors.contains(&id) {
                candidates.push(id);
                continue;
            }
            if let Some(commit) = self.commits.get(&id) {
                for parent_digest in &commit.parent_digests {
                    if let Some(&parent_id) = self.digest_index.get(parent_digest) {
                        queue.push_back(parent_id);
                    }
                }
            }
        }

        candidates.into_iter().max_by_key(|id| self.commits.get(id).map(|c| c.timestamp))
    }

    fn commit_ancestor_ids(&self, start: uuid::Uuid) -> Vec<uuid::Uuid> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            if let Some(commit) = self.commits.get(&id) {
                for parent_digest in &commit.parent_digests {
                    if let Some(&parent_id) = self.digest_index.get(parent_digest) {
                        queue.push_back(parent_id);
                    }
                }
            }
        }
        out
    }

    /// Three-way merges `source_branch` into the active branch. Local text is
    /// read from the working tree at `root` when present, else from the blob
    /// store; base and remote text always come from the blob store.
    pub async fn merge(
        &self,
        source_branch: &str,
        root: &Path,
        blobs: &BlobStore,
        strategy: DiffStrategyKind,
    ) -> Result<Vec<Conflict>> {
        let active = self.current_branch().ok_or_else(|| LinageError::InvalidInput("no active branch".into()))?;
        let active_head = active.head.clone().ok_or_else(|| LinageError::InvalidInput("active branch has no commits".into()))?;
        let source = self.branches.get(source_branch).ok_or_else(|| LinageError::NotFound(format!("branch `{source_branch}`")))?;
        let source_head = source.head.clone().ok_or_else(|| LinageError::InvalidInput(format!("branch `{source_branch}` has no commits")))?;

        let active_id = *self.digest_index.get(&active_head).ok_or_else(|| LinageError::Corruption("active head missing from cache".into()))?;
        let source_id = *self.digest_index.get(&source_head).ok_or_else(|| LinageError::Corruption("source head missing from cache".into()))?;

        let base_id = self
            .find_common_ancestor(active_id, source_id)
            .ok_or_else(|| LinageError::Conflict(format!("no common ancestor with `{source_branch}`")))?;

        let base_commit = self.commits.get(&base_id).ok_or_else(|| LinageError::Corruption("base commit missing from cache".into()))?;
        let local_commit = self.commits.get(&active_id).ok_or_else(|| LinageError::Corruption("local head missing from cache".into()))?;
        let remote_commit = self.commits.get(&source_id).ok_or_else(|| LinageError::Corruption("remote head missing from cache".into()))?;

        let mut paths: HashSet<&str> = HashSet::new();
        paths.extend(base_commit.snapshot.files.iter().map(|f| f.path.as_str()));
        paths.extend(local_commit.snapshot.files.iter().map(|f| f.path.as_str()));
        paths.extend(remote_commit.snapshot.files.iter().map(|f| f.path.as_str()));

        let engine = MergeEngine::new(strategy);
        let mut conflicts = Vec::new();

        for path in paths {
            let base_text = read_snapshot_text(base_commit.snapshot.file(path), blobs)?;
            let remote_text = read_snapshot_text(remote_commit.snapshot.file(path), blobs)?;
            let local_text = match std::fs::read_to_string(root.join(path)) {
                Ok(text) => text,
                Err(_) => read_snapshot_text(local_commit.snapshot.file(path), blobs)?,
            };

            let result = engine.merge(path, &base_text, &local_text, &remote_text);
            if !result.success {
                conflicts.extend(result.conflicts);
            }
        }

        if conflicts.is_empty() {
            info!(source = source_branch, "clean merge");
        } else {
            warn!(source = source_branch, conflicts = conflicts.len(), "merge produced conflicts");
        }
        Ok(conflicts)
    }

    /// Replays the first-parent chain from (exclusive of) the merge base of
    /// the active head and `onto`, onto `onto`, with fresh ids/digests and
    /// timestamps but preserved messages. Merge commits in that chain are
    /// replayed using only their first parent, dropping other parent edges.
    pub async fn rebase(&mut self, onto: uuid::Uuid) -> Result<()> {
        let active_name = self.active_branch.clone().ok_or_else(|| LinageError::InvalidInput("no active branch".into()))?;
        let active_head_digest = self
            .branches
            .get(&active_name)
            .and_then(|b| b.head.clone())
            .ok_or_else(|| LinageError::InvalidInput("active branch has no commits".into()))?;
        let active_head = *self.digest_index.get(&active_head_digest).ok_or_else(|| LinageError::Corruption("active head missing from cache".into()))?;

        let base = self.find_common_ancestor(active_head, onto).ok_or_else(|| LinageError::Conflict("no common ancestor to rebase onto".into()))?;

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = active_head;
        loop {
            if cursor == base {
                break;
            }
            if !seen.insert(cursor) {
                return Err(LinageError::Corruption("cycle detected while collecting rebase chain".into()));
            }
            let commit = self.commits.get(&cursor).ok_or_else(|| LinageError::Corruption("commit missing from cache during rebase".into()))?;
            chain.push(cursor);
            match commit.parent_digests.first().and_then(|d| self.digest_index.get(d)) {
                Some(&parent_id) => cursor = parent_id,
                None => break,
            }
        }
        chain.reverse();

        let mut parent_id = onto;
        for commit_id in chain {
            let original = self.commits.get(&commit_id).ok_or_else(|| LinageError::Corruption("commit missing from cache during rebase".into()))?.clone();
            let parent_digest = self.commits.get(&parent_id).map(|c| c.digest.clone()).ok_or_else(|| LinageError::Corruption("rebase parent missing from cache".into()))?;

            let replayed = Commit::new(
                self.hasher,
                original.message.clone(),
                original.author_name.clone(),
                original.author_email.clone(),
                chrono::Utc::now(),
                vec![parent_digest],
                original.snapshot.clone(),
                original.ai_assisted,
            );
            let replayed_id = replayed.id;
            self.add_commit(replayed).await?;
            parent_id = replayed_id;
        }

        let mut branch = self.branches.get(&active_name).cloned().unwrap();
        branch.head = self.commits.get(&parent_id).map(|c| c.digest.clone());
        self.store.save_branch(&branch).await?;
        self.branches.insert(active_name, branch);
        self.history_cache = None;
        Ok(())
    }
}

fn read_snapshot_text(record: Option<&FileRecord>, blobs: &BlobStore) -> Result<String> {
    match record {
        None | Some(FileRecord { deleted: true, .. }) => Ok(String::new()),
        Some(record) => {
            let bytes = blobs.get(&record.digest)?;
            String::from_utf8(bytes).map_err(|e| LinageError::Corruption(format!("blob for `{}` is not valid UTF-8: {e}", record.path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;
    use crate::metadata_store::sqlite::SqliteMetadataStore;
    use crate::domain::Snapshot;

    async fn service() -> GraphService {
        let store: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::connect("sqlite::memory:").await.unwrap());
        GraphService::hydrate(store, Hasher::new(HashAlgorithm::Sha256)).await.unwrap()
    }

    fn commit(hasher: Hasher, message: &str, parents: Vec<Digest>) -> Commit {
        let snapshot = Snapshot::new(hasher, chrono::Utc::now(), vec![]);
        Commit::new(hasher, message, "Ada", "ada@example.com", chrono::Utc::now(), parents, snapshot, false)
    }

    #[tokio::test]
    async fn create_branch_requires_active_branch_when_history_exists() {
        let store: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::connect("sqlite::memory:").await.unwrap());
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        store.save_commit(&commit(hasher, "orphan", vec![])).await.unwrap();

        let mut service = GraphService::hydrate(store, hasher).await.unwrap();
        let err = service.create_branch("feature").await.unwrap_err();
        assert!(matches!(err, LinageError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_branch_name_is_rejected() {
        let mut service = service().await;
        service.create_branch("main").await.unwrap();
        let err = service.create_branch("main").await.unwrap_err();
        assert!(matches!(err, LinageError::Conflict(_)));
    }

    #[tokio::test]
    async fn branch_lifecycle_round_trips() {
        let mut service = service().await;
        let branch = service.create_branch("main").await.unwrap();
        assert_eq!(branch.name, "main");
        service.switch_branch("main").await.unwrap();
        assert_eq!(service.current_branch().unwrap().name, "main");

        let err = service.delete_branch("main").await.unwrap_err();
        assert!(matches!(err, LinageError::Conflict(_)));
    }

    #[tokio::test]
    async fn history_orders_by_timestamp_descending() {
        let mut service = service().await;
        service.create_branch("main").await.unwrap();
        service.switch_branch("main").await.unwrap();

        let hasher = service.hasher();
        let first = commit(hasher, "first", vec![]);
        service.add_commit(first.clone()).await.unwrap();
        let second = commit(hasher, "second", vec![first.digest.clone()]);
        service.add_commit(second).await.unwrap();

        let history = service.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "second");
    }

    #[tokio::test]
    async fn common_ancestor_found_across_diverging_branches() {
        let mut service = service().await;
        service.create_branch("main").await.unwrap();
        service.switch_branch("main").await.unwrap();

        let hasher = service.hasher();
        let root = commit(hasher, "root", vec![]);
        service.add_commit(root.clone()).await.unwrap();

        service.create_branch("feature").await.unwrap();

        let on_main = commit(hasher, "on-main", vec![root.digest.clone()]);
        service.add_commit(on_main).await.unwrap();

        service.switch_branch("feature").await.unwrap();
        let on_feature = commit(hasher, "on-feature", vec![root.digest.clone()]);
        service.add_commit(on_feature.clone()).await.unwrap();

        let main_head = service.digest_index[&service.branches["main"].head.clone().unwrap()];
        let feature_head = service.digest_index[&service.branches["feature"].head.clone().unwrap()];
        let ancestor = service.find_common_ancestor(main_head, feature_head).unwrap();
        assert_eq!(ancestor, service.digest_index[&root.digest]);
    }
}
