//! The library's single public entry point: a thin façade owning one
//! `BlobStore`, one `MetadataStore` connection, one `GraphService`, one
//! `ChangeDetector` (with its `Watcher`), and the active `IgnoreFilter`. It
//! performs no business logic beyond orchestration and translating component
//! errors into `LinageError`; the `linage` CLI binary drives it end to end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_absolutize::Absolutize;
use tracing::info;

use crate::change_detector::{CancellationToken, ChangeDetector, DirtyStatus};
use crate::config::LinageConfig;
use crate::diff::DiffStrategyKind;
use crate::domain::{Branch, Commit, Conflict, FileRecord, Snapshot};
use crate::errors::Result;
use crate::graph_service::GraphService;
use crate::hash::Hasher;
use crate::ignore::IgnoreFilter;
use crate::metadata_store::sqlite::SqliteMetadataStore;
use crate::metadata_store::MetadataStore;
use crate::recovery::RecoveryManager;
use crate::scanner::FileScanner;
use crate::storage::BlobStore;
use crate::watcher::Watcher;

pub struct Repository {
    root: PathBuf,
    config: LinageConfig,
    blobs: BlobStore,
    graph: GraphService,
    detector: Arc<ChangeDetector>,
    ignore: IgnoreFilter,
    recovery: RecoveryManager,
    watcher: Option<Watcher>,
}

impl Repository {
    /// Creates a fresh `.linage/` directory and an empty `main` branch.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = root.absolutize()?.into_owned();
        std::fs::create_dir_all(&root)?;
        let config = LinageConfig::for_repo_root(&root);
        std::fs::create_dir_all(LinageConfig::linage_dir(&root))?;
        std::fs::create_dir_all(LinageConfig::backups_dir(&root))?;

        let mut repo = Self::connect(root, config).await?;
        repo.graph.create_branch("main").await?;
        repo.graph.switch_branch("main").await?;
        info!(root = %repo.root.display(), "repository initialized");
        Ok(repo)
    }

    /// Opens an existing repository, hydrating the graph cache from its
    /// metadata store and running an initial scan against HEAD.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = root.absolutize()?.into_owned();
        let config = LinageConfig::for_repo_root(&root);
        let repo = Self::connect(root, config).await?;
        repo.rescan()?;
        info!(root = %repo.root.display(), "repository opened");
        Ok(repo)
    }

    async fn connect(root: PathBuf, config: LinageConfig) -> Result<Self> {
        let hasher = Hasher::new(config.hash_algorithm);
        let blobs = BlobStore::open(LinageConfig::objects_dir(&root), hasher)?;
        let store: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::connect(&config.metadata_connection).await?);
        let graph = GraphService::hydrate(store, hasher).await?;

        let mut ignore = IgnoreFilter::new();
        let gitignore = root.join(".gitignore");
        if gitignore.exists() {
            ignore.load_file(&gitignore)?;
        }

        let recovery = RecoveryManager::new(LinageConfig::logs_dir(&root))?;

        Ok(Self { root, config, blobs, graph, detector: Arc::new(ChangeDetector::new()), ignore, recovery, watcher: None })
    }

    pub fn hasher(&self) -> Hasher {
        self.graph.hasher()
    }

    /// Starts a background `Watcher`, feeding events straight into the
    /// `ChangeDetector`'s dirty map.
    pub fn start_watching(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let root = self.root.clone();
        let recursive = self.config.watcher_recursive;
        let detector = Arc::clone(&self.detector);
        let watcher = Watcher::start(root.clone(), recursive, move |event| detector.on_watch_event(&event, &root))?;
        self.watcher = Some(watcher);
        Ok(())
    }

    pub fn stop_watching(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
    }

    fn head_files(&self) -> Vec<FileRecord> {
        self.graph
            .current_branch()
            .and_then(|b| b.head.as_ref())
            .and_then(|digest| self.graph.commit_by_digest(digest))
            .map(|c| c.snapshot.files.clone())
            .unwrap_or_default()
    }

    /// Recomputes the dirty set against HEAD's file records.
    pub fn rescan(&self) -> Result<()> {
        let head_files = self.head_files();
        let token = CancellationToken::new();
        self.detector.scan(&self.root, &self.ignore, self.hasher(), self.config.scan_progress_interval, &head_files, &token, |_| {})?;
        Ok(())
    }

    pub fn status(&self) -> Vec<(String, DirtyStatus)> {
        self.detector.dirty_paths()
    }

    /// Snapshots the working tree, writes every non-deleted file's bytes into
    /// the blob store, builds a commit referencing the active branch's head
    /// as its sole parent (or no parent for the first commit), and advances
    /// the branch.
    pub async fn commit(&mut self, message: impl Into<String>, author_name: impl Into<String>, author_email: impl Into<String>) -> Result<Commit> {
        let hasher = self.hasher();
        let scanner = FileScanner::new(&self.root, &self.ignore, hasher, self.config.scan_progress_interval);
        let mut files = scanner.scan(|_| {})?;

        for record in &files {
            let bytes = std::fs::read(self.root.join(&record.path))?;
            self.blobs.put(&bytes)?;
        }

        let live_paths: std::collections::HashSet<&str> = files.iter().map(|f| f.path.as_str()).collect();
        let now = chrono::Utc::now();
        let mut deletions = Vec::new();
        for head_record in self.head_files() {
            if !head_record.deleted && !live_paths.contains(head_record.path.as_str()) {
                deletions.push(FileRecord::deletion(head_record.path, hasher.algorithm(), now));
            }
        }
        drop(live_paths);
        files.extend(deletions);

        let snapshot = Snapshot::new(hasher, now, files);
        let parents = match self.graph.current_branch().and_then(|b| b.head.clone()) {
            Some(head) => vec![head],
            None => Vec::new(),
        };

        let commit = Commit::new(hasher, message, author_name, author_email, chrono::Utc::now(), parents, snapshot, false);
        self.graph.add_commit(commit.clone()).await?;
        self.detector.clear();
        info!(commit = %commit.digest, "commit created");
        Ok(commit)
    }

    pub async fn create_branch(&mut self, name: &str) -> Result<Branch> {
        self.graph.create_branch(name).await
    }

    pub async fn switch_branch(&mut self, name: &str) -> Result<()> {
        self.graph.switch_branch(name).await?;
        self.rescan()
    }

    pub async fn delete_branch(&mut self, name: &str) -> Result<()> {
        self.graph.delete_branch(name).await
    }

    pub async fn merge(&self, source_branch: &str) -> Result<Vec<Conflict>> {
        self.merge_with_strategy(source_branch, self.config.default_merge_strategy).await
    }

    pub async fn merge_with_strategy(&self, source_branch: &str, strategy: DiffStrategyKind) -> Result<Vec<Conflict>> {
        self.graph.merge(source_branch, &self.root, &self.blobs, strategy).await
    }

    pub async fn rebase(&mut self, onto: uuid::Uuid) -> Result<()> {
        self.graph.rebase(onto).await
    }

    pub fn log(&mut self) -> Result<Vec<Commit>> {
        self.graph.history()
    }

    pub fn find_dangling(&self) -> Vec<Commit> {
        self.recovery.find_dangling(&self.graph)
    }

    pub async fn recover(&mut self, commit_id: uuid::Uuid, new_branch_name: &str) -> Result<Branch> {
        self.recovery.recover(&mut self.graph, commit_id, new_branch_name).await
    }

    pub async fn rollback_branch(&mut self, branch: &str, target: &Commit) -> Result<()> {
        self.recovery.rollback_branch(&mut self.graph, branch, target).await
    }

    pub fn config(&self) -> &LinageConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }
}

/// Runs an async `Repository` constructor or method to completion on a
/// fresh current-thread `tokio` runtime, for callers outside an async
/// context (the CLI binary and simple scripts).
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to start current-thread runtime");
    runtime.block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_main_branch_with_no_commits() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).await.unwrap();
        assert_eq!(repo.graph.current_branch().unwrap().name, "main");
        assert!(repo.graph.current_branch().unwrap().head.is_none());
    }

    #[tokio::test]
    async fn commit_records_staged_file_and_advances_head() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();

        let mut repo = Repository::init(dir.path()).await.unwrap();
        let commit = repo.commit("init", "Ada", "ada@example.com").await.unwrap();

        assert_eq!(commit.snapshot.files.len(), 1);
        assert_eq!(commit.snapshot.files[0].path, "README.md");
        assert_eq!(repo.graph.current_branch().unwrap().head, Some(commit.digest));

        let history = repo.log().unwrap();
        assert_eq!(history.len(), 1);
    }
}
