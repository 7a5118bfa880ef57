//! Recursive working-tree walk producing `FileRecord` values with content
//! digest and size. Skips ignored paths and the repository's own internal
//! directory; fires a progress callback every `progress_interval` files.

use std::path::Path;

use crate::domain::FileRecord;
use crate::errors::Result;
use crate::hash::Hasher;
use crate::ignore::IgnoreFilter;
use crate::utils::normalize_relative_path;

pub struct FileScanner<'a> {
    root: &'a Path,
    ignore: &'a IgnoreFilter,
    hasher: Hasher,
    progress_interval: usize,
}

impl<'a> FileScanner<'a> {
    pub fn new(root: &'a Path, ignore: &'a IgnoreFilter, hasher: Hasher, progress_interval: usize) -> Self {
        Self { root, ignore, hasher, progress_interval: progress_interval.max(1) }
    }

    /// Walks the tree once, calling `on_progress(count)` every
    /// `progress_interval` files and returning the full list of live
    /// `FileRecord`s. Non-restartable: construct a new scanner to rescan.
    pub fn scan(&self, mut on_progress: impl FnMut(usize)) -> Result<Vec<FileRecord>> {
        let mut records = Vec::new();
        let mut seen = 0usize;
        self.walk(self.root, &mut records, &mut seen, &mut on_progress)?;
        Ok(records)
    }

    fn walk(
        &self,
        dir: &Path,
        records: &mut Vec<FileRecord>,
        seen: &mut usize,
        on_progress: &mut impl FnMut(usize),
    ) -> Result<()> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                if self.is_internal(&path) {
                    continue;
                }
                self.walk(&path, records, seen, on_progress)?;
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            let relative = normalize_relative_path(self.root, &path);
            if self.ignore.is_ignored(&relative, false) {
                continue;
            }

            let bytes = std::fs::read(&path)?;
            let digest = self.hasher.hash_bytes(&bytes);
            let metadata = entry.metadata()?;
            let modified_at = metadata
                .modified()
                .ok()
                .map(chrono::DateTime::<chrono::Utc>::from)
                .unwrap_or_else(chrono::Utc::now);

            records.push(FileRecord::new(relative, digest, bytes.len() as u64, modified_at));

            *seen += 1;
            if *seen % self.progress_interval == 0 {
                on_progress(*seen);
            }
        }

        Ok(())
    }

    fn is_internal(&self, path: &Path) -> bool {
        path.file_name().map(|n| n == ".linage" || n == ".git").unwrap_or(false)
    }
}
