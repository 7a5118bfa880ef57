//! Maintains the working tree's dirty set relative to HEAD. Two update
//! paths feed the same concurrent map: `Watcher` events update it
//! immediately, and `scan()` recomputes the full dirty set by comparing a
//! fresh `FileScanner` walk against HEAD's file records. The scan
//! partitions its comparison across `rayon`'s global pool, bounded by
//! hardware concurrency, and checks a cancellation flag at partition
//! boundaries.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::info;

use crate::domain::FileRecord;
use crate::errors::Result;
use crate::hash::{Digest, Hasher};
use crate::ignore::IgnoreFilter;
use crate::scanner::FileScanner;
use crate::watcher::{WatchEvent, WatchEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyStatus {
    New,
    Modified,
    Deleted,
}

#[derive(Default)]
pub struct ChangeDetector {
    dirty: DashMap<String, DirtyStatus>,
}

/// A cooperative cancellation flag, checked at scan-partition boundaries.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub enum ScanOutcome {
    Completed,
    Cancelled,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self { dirty: DashMap::new() }
    }

    /// Applies a single watcher event to the dirty map immediately.
    pub fn on_watch_event(&self, event: &WatchEvent, root: &Path) {
        let relative = crate::utils::normalize_relative_path(root, &event.path);
        match event.kind {
            WatchEventKind::Deleted => {
                self.dirty.insert(relative, DirtyStatus::Deleted);
            }
            WatchEventKind::Created => {
                self.dirty.insert(relative, DirtyStatus::New);
            }
            WatchEventKind::Modified | WatchEventKind::Renamed => {
                self.dirty.insert(relative, DirtyStatus::Modified);
            }
        }
    }

    /// Recomputes the dirty set against `head_files`, walking `root` with a
    /// fresh `FileScanner`. Comparisons are partitioned across the rayon
    /// pool; `cancellation` is checked between partitions.
    pub fn scan(
        &self,
        root: &Path,
        ignore: &IgnoreFilter,
        hasher: Hasher,
        progress_interval: usize,
        head_files: &[FileRecord],
        cancellation: &CancellationToken,
        mut on_progress: impl FnMut(usize),
    ) -> Result<ScanOutcome> {
        let scanner = FileScanner::new(root, ignore, hasher, progress_interval);
        let live = scanner.scan(&mut on_progress)?;

        let head_by_path: HashMap<&str, &Digest> =
            head_files.iter().filter(|f| !f.deleted).map(|f| (f.path.as_str(), &f.digest)).collect();

        let partitions: Vec<&[FileRecord]> = live.chunks(partition_size(live.len())).collect();

        for partition in partitions {
            if cancellation.is_cancelled() {
                return Ok(ScanOutcome::Cancelled);
            }
            let statuses: Vec<(String, Option<DirtyStatus>)> = partition
                .par_iter()
                .map(|record| {
                    let status = match head_by_path.get(record.path.as_str()) {
                        None => Some(DirtyStatus::New),
                        Some(head_digest) if **head_digest != record.digest => Some(DirtyStatus::Modified),
                        Some(_) => None,
                    };
                    (record.path.clone(), status)
                })
                .collect();

            for (path, status) in statuses {
                match status {
                    Some(status) => {
                        self.dirty.insert(path, status);
                    }
                    None => {
                        self.dirty.remove(&path);
                    }
                }
            }
        }

        let live_paths: std::collections::HashSet<&str> = live.iter().map(|f| f.path.as_str()).collect();
        for head_record in head_files.iter().filter(|f| !f.deleted) {
            if !live_paths.contains(head_record.path.as_str()) {
                self.dirty.insert(head_record.path.clone(), DirtyStatus::Deleted);
            }
        }

        info!(dirty = self.dirty.len(), "scan complete");
        Ok(ScanOutcome::Completed)
    }

    pub fn has_conflict(&self, root: &Path, relative_path: &str, expected: &Digest, hasher: Hasher) -> bool {
        let full_path = root.join(relative_path);
        match std::fs::read(&full_path) {
            Ok(bytes) => hasher.hash_bytes(&bytes) != *expected,
            Err(_) => true,
        }
    }

    pub fn dirty_paths(&self) -> Vec<(String, DirtyStatus)> {
        self.dirty.iter().map(|entry| (entry.key().clone(), *entry.value())).collect()
    }

    pub fn clear(&self) {
        self.dirty.clear();
    }
}

fn partition_size(total: usize) -> usize {
    let workers = num_cpus::get().max(1);
    (total / workers).max(1)
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetector").field("dirty_count", &self.dirty.len()).finish()
    }
}
