//! CLI-facing unified diff rendering between two commits' snapshots. This is
//! presentation only: the line-granular `DiffStrategy` trait in `diff/` is
//! the engine the merge and line-tracking modules depend on; this module
//! exists so `linage show`/`linage diff` can print something a human reads,
//! using `similar`'s Myers implementation the way a plain text diff tool would.

use std::fmt::Write as _;

use similar::{ChangeTag, TextDiff};

use crate::domain::Commit;
use crate::errors::Result;
use crate::storage::BlobStore;

/// A safety cap on the number of hunks/lines rendered for a single file,
/// guarding against pathologically large generated files.
const MAX_DIFF_LINES: usize = 10_000;
const LARGE_FILE_MARKER: &str = "<large file, diff omitted>";

/// One file's unified diff text, or a large-file marker in place of the body.
#[derive(Debug, Clone)]
pub struct DiffItem {
    pub path: String,
    pub text: String,
}

/// Computes a unified diff between `old` and `new` line slices and renders
/// it as `+`/`-`/` ` prefixed lines, without the `@@` hunk-header bookkeeping
/// a patch-apply tool would need — this is a read-only viewer.
pub fn unified_text(old_text: &str, new_text: &str) -> String {
    let diff = TextDiff::from_lines(old_text, new_text);
    let mut out = String::new();
    for (count, change) in diff.iter_all_changes().enumerate() {
        if count >= MAX_DIFF_LINES {
            out.push_str(LARGE_FILE_MARKER);
            out.push('\n');
            break;
        }
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        let _ = write!(out, "{sign}{}", change.value());
        if !change.value().ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Diffs every file present in either commit's snapshot, reading blob
/// contents lazily and skipping files whose digest is unchanged.
pub fn diff_commits(old: &Commit, new: &Commit, blobs: &BlobStore) -> Result<Vec<DiffItem>> {
    let mut paths: Vec<&str> = Vec::new();
    for file in old.snapshot.files.iter().chain(new.snapshot.files.iter()) {
        if !paths.contains(&file.path.as_str()) {
            paths.push(&file.path);
        }
    }
    paths.sort_unstable();

    let mut items = Vec::new();
    for path in paths {
        let old_file = old.snapshot.file(path);
        let new_file = new.snapshot.file(path);

        let unchanged = match (old_file, new_file) {
            (Some(a), Some(b)) => a.digest == b.digest && a.deleted == b.deleted,
            _ => false,
        };
        if unchanged {
            continue;
        }

        let old_text = read_text(old_file.filter(|f| !f.deleted), blobs)?;
        let new_text = read_text(new_file.filter(|f| !f.deleted), blobs)?;
        items.push(DiffItem { path: path.to_string(), text: unified_text(&old_text, &new_text) });
    }
    Ok(items)
}

fn read_text(record: Option<&crate::domain::FileRecord>, blobs: &BlobStore) -> Result<String> {
    match record {
        Some(record) => {
            let bytes = blobs.get(&record.digest)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unified_text_marks_inserted_and_deleted_lines() {
        let old = "one\ntwo\nthree\n";
        let new = "one\nthree\nfour\n";
        let rendered = unified_text(old, new);
        assert!(rendered.contains("-two\n"));
        assert!(rendered.contains("+four\n"));
        assert!(rendered.contains(" one\n"));
    }

    #[test]
    fn unified_text_is_empty_for_identical_input() {
        let text = "a\nb\nc\n";
        let rendered = unified_text(text, text);
        assert!(rendered.lines().all(|line| line.starts_with(' ')));
    }

    #[test]
    fn large_diff_is_truncated_with_marker() {
        let old = String::new();
        let new: String = (0..MAX_DIFF_LINES + 5).map(|i| format!("line{i}\n")).collect();
        let rendered = unified_text(&old, &new);
        assert!(rendered.contains(LARGE_FILE_MARKER));
    }
}
