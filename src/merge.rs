//! Three-way merge at line granularity. Three fast paths short-circuit the
//! common cases; otherwise the engine detects whether the two sides touched
//! overlapping base lines and either emits conflict markers or performs a
//! best-effort positional merge.
//!
//! The non-overlapping path walks a single index space keyed by base-line
//! number. A line modification never arrives as a single `Modify` opcode
//! from Myers or Patience — both encode it as a `Delete` immediately
//! followed by an `Insert` — so replacements are tracked by base index and
//! insertions are tracked by the base index they precede, then interleaved
//! back together in base order.

use std::collections::BTreeSet;

use crate::diff::DiffStrategyKind;
use crate::domain::Conflict;
use crate::utils::{join_lines_platform, split_lines};

pub struct MergeEngine {
    strategy: DiffStrategyKind,
}

pub struct MergeResult {
    pub success: bool,
    pub merged_text: String,
    pub conflicts: Vec<Conflict>,
}

impl MergeEngine {
    pub fn new(strategy: DiffStrategyKind) -> Self {
        Self { strategy }
    }

    pub fn merge(&self, path: &str, base: &str, local: &str, remote: &str) -> MergeResult {
        if local == remote {
            return MergeResult { success: true, merged_text: local.to_string(), conflicts: Vec::new() };
        }
        if base == local {
            return MergeResult { success: true, merged_text: remote.to_string(), conflicts: Vec::new() };
        }
        if base == remote {
            return MergeResult { success: true, merged_text: local.to_string(), conflicts: Vec::new() };
        }

        let base_lines = split_lines(base);
        let local_lines = split_lines(local);
        let remote_lines = split_lines(remote);

        let local_ops = self.strategy.compute(&base_lines, &local_lines);
        let remote_ops = self.strategy.compute(&base_lines, &remote_lines);

        let local_touched = touched_base_indices(&local_ops);
        let remote_touched = touched_base_indices(&remote_ops);

        if !local_touched.is_disjoint(&remote_touched) {
            let merged_text = format!("<<<<<<< LOCAL\n{local}\n=======\n{remote}\n>>>>>>> REMOTE\n");
            let conflict = Conflict::new(path, base.to_string(), local.to_string(), remote.to_string());
            return MergeResult { success: false, merged_text, conflicts: vec![conflict] };
        }

        let local_edits = base_line_map(&local_ops, &local_lines);
        let remote_edits = base_line_map(&remote_ops, &remote_lines);

        let mut merged_lines = Vec::with_capacity(base_lines.len());
        for i in 0..=base_lines.len() {
            if let Some(inserted) = local_edits.insertions.get(&i) {
                merged_lines.extend(inserted.iter().cloned());
            } else if let Some(inserted) = remote_edits.insertions.get(&i) {
                merged_lines.extend(inserted.iter().cloned());
            }
            if i == base_lines.len() {
                break;
            }
            if let Some(replacement) = local_edits.replacements.get(&i) {
                merged_lines.extend(replacement.iter().cloned());
            } else if let Some(replacement) = remote_edits.replacements.get(&i) {
                merged_lines.extend(replacement.iter().cloned());
            } else {
                merged_lines.push(base_lines[i].clone());
            }
        }

        MergeResult { success: true, merged_text: join_lines_platform(&merged_lines), conflicts: Vec::new() }
    }
}

/// The set of base-line indices any non-equal opcode touched.
fn touched_base_indices(ops: &[crate::diff::Opcode]) -> BTreeSet<usize> {
    let mut set = BTreeSet::new();
    for op in ops {
        if !op.is_equal() {
            set.extend(op.old_range());
        }
    }
    set
}

/// One side's edits against the base, indexed for positional replay: a
/// `replacements` entry at base index `i` replaces `base[i]` (an empty vec
/// deletes it with nothing in its place); an `insertions` entry at `i`
/// inserts lines immediately before `base[i]` (`i == base_lines.len()`
/// anchors a trailing append).
struct BaseLineEdits {
    replacements: std::collections::HashMap<usize, Vec<String>>,
    insertions: std::collections::HashMap<usize, Vec<String>>,
}

/// Builds a `BaseLineEdits` from one side's opcodes against base. A
/// `Delete` immediately followed by an `Insert` at the same position — how
/// Myers and Patience encode a line modification — naturally recombines
/// here: the delete empties the base slot and the insert anchors its
/// replacement lines right after it.
fn base_line_map(ops: &[crate::diff::Opcode], new_lines: &[String]) -> BaseLineEdits {
    use crate::diff::Opcode;
    let mut replacements: std::collections::HashMap<usize, Vec<String>> = std::collections::HashMap::new();
    let mut insertions: std::collections::HashMap<usize, Vec<String>> = std::collections::HashMap::new();

    for op in ops {
        match op {
            Opcode::Modify { old, new } => {
                for (i, j) in old.clone().zip(new.clone()) {
                    replacements.insert(i, vec![new_lines[j].clone()]);
                }
            }
            Opcode::Delete { old, .. } => {
                for i in old.clone() {
                    replacements.entry(i).or_default();
                }
            }
            Opcode::Insert { old, new } => {
                let lines: Vec<String> = new.clone().map(|j| new_lines[j].clone()).collect();
                if !lines.is_empty() {
                    insertions.entry(old.start).or_default().extend(lines);
                }
            }
            Opcode::Equal { .. } => {}
        }
    }

    BaseLineEdits { replacements, insertions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MergeEngine {
        MergeEngine::new(DiffStrategyKind::Myers)
    }

    #[test]
    fn identical_local_and_remote_wins_without_conflict() {
        let result = engine().merge("f.txt", "base\n", "same\n", "same\n");
        assert!(result.success);
        assert_eq!(result.merged_text, "same\n");
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn only_remote_changed() {
        let result = engine().merge("f.txt", "base\n", "base\n", "changed\n");
        assert!(result.success);
        assert_eq!(result.merged_text, "changed\n");
    }

    #[test]
    fn only_local_changed() {
        let result = engine().merge("f.txt", "base\n", "changed\n", "base\n");
        assert!(result.success);
        assert_eq!(result.merged_text, "changed\n");
    }

    #[test]
    fn non_overlapping_changes_merge_cleanly() {
        let result = engine().merge("f.txt", "A\nB\nC\n", "A-mod\nB\nC\n", "A\nB\nC-mod\n");
        assert!(result.success);
        assert_eq!(result.merged_text, "A-mod\nB\nC-mod\n");
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn local_only_insertion_survives_alongside_an_unrelated_remote_edit() {
        let result = engine().merge("f.txt", "A\nB\n", "A\nX\nB\n", "A\nB-mod\n");
        assert!(result.success);
        assert_eq!(result.merged_text, "A\nX\nB-mod\n");
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn overlapping_changes_produce_conflict_markers() {
        let result = engine().merge("f.txt", "A\n", "A-local\n", "A-remote\n");
        assert!(!result.success);
        assert_eq!(result.conflicts.len(), 1);
        assert!(result.merged_text.contains("<<<<<<< LOCAL"));
        assert!(result.merged_text.contains("======="));
        assert!(result.merged_text.contains(">>>>>>> REMOTE"));
    }

    #[test]
    fn three_way_symmetry_for_disjoint_changes() {
        let a = engine().merge("f.txt", "A\nB\nC\n", "A-mod\nB\nC\n", "A\nB\nC-mod\n");
        let b = engine().merge("f.txt", "A\nB\nC\n", "A\nB\nC-mod\n", "A-mod\nB\nC\n");
        assert_eq!(a.merged_text, b.merged_text);
    }
}
