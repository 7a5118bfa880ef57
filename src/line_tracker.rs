//! Converts a diff strategy's opcodes over old/new text into hashed
//! `LineChange` records: one per added/deleted line, pairwise for the
//! overlapping part of a modify, with any excess tail spilling to
//! added/deleted.

use chrono::{DateTime, Utc};

use crate::diff::{DiffStrategyKind, Opcode};
use crate::domain::LineChange;
use crate::hash::Hasher;
use crate::utils::split_lines;

pub struct LineTracker {
    hasher: Hasher,
    strategy: DiffStrategyKind,
}

impl LineTracker {
    pub fn new(hasher: Hasher, strategy: DiffStrategyKind) -> Self {
        Self { hasher, strategy }
    }

    /// Splits `old_text`/`new_text` on universal newlines, computes opcodes,
    /// and emits the resulting `LineChange` records.
    pub fn track(&self, old_text: &str, new_text: &str, timestamp: DateTime<Utc>) -> Vec<LineChange> {
        let old_lines = split_lines(old_text);
        let new_lines = split_lines(new_text);
        let opcodes = self.strategy.compute(&old_lines, &new_lines);
        self.changes_from_opcodes(&old_lines, &new_lines, &opcodes, timestamp)
    }

    fn changes_from_opcodes(
        &self,
        old_lines: &[String],
        new_lines: &[String],
        opcodes: &[Opcode],
        timestamp: DateTime<Utc>,
    ) -> Vec<LineChange> {
        let mut changes = Vec::new();

        for op in opcodes {
            match op {
                Opcode::Equal { .. } => {}
                Opcode::Insert { new, .. } => {
                    for j in new.clone() {
                        let digest = self.hasher.hash_text(&new_lines[j]);
                        changes.push(LineChange::added(j + 1, digest, timestamp));
                    }
                }
                Opcode::Delete { old, .. } => {
                    for i in old.clone() {
                        let digest = self.hasher.hash_text(&old_lines[i]);
                        changes.push(LineChange::deleted(i + 1, digest, timestamp));
                    }
                }
                Opcode::Modify { old, new } => {
                    let overlap = old.len().min(new.len());
                    for k in 0..overlap {
                        let old_digest = self.hasher.hash_text(&old_lines[old.start + k]);
                        let new_digest = self.hasher.hash_text(&new_lines[new.start + k]);
                        changes.push(LineChange::modified(new.start + k + 1, old_digest, new_digest, timestamp));
                    }
                    if old.len() > overlap {
                        for i in (old.start + overlap)..old.end {
                            let digest = self.hasher.hash_text(&old_lines[i]);
                            changes.push(LineChange::deleted(i + 1, digest, timestamp));
                        }
                    }
                    if new.len() > overlap {
                        for j in (new.start + overlap)..new.end {
                            let digest = self.hasher.hash_text(&new_lines[j]);
                            changes.push(LineChange::added(j + 1, digest, timestamp));
                        }
                    }
                }
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChangeKind;
    use crate::hash::HashAlgorithm;

    fn tracker(strategy: DiffStrategyKind) -> LineTracker {
        LineTracker::new(Hasher::new(HashAlgorithm::Sha256), strategy)
    }

    #[test]
    fn insert_only_produces_added_changes() {
        let t = tracker(DiffStrategyKind::Myers);
        let changes = t.track("a\nc\n", "a\nb\nc\n", Utc::now());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Added);
        assert_eq!(changes[0].line_number, 2);
    }

    #[test]
    fn delete_only_produces_deleted_changes() {
        let t = tracker(DiffStrategyKind::Myers);
        let changes = t.track("a\nb\nc\n", "a\nc\n", Utc::now());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Deleted);
        assert_eq!(changes[0].line_number, 2);
    }

    #[test]
    fn minimal_strategy_replace_emits_modified() {
        let t = tracker(DiffStrategyKind::Minimal);
        let changes = t.track("a\nb\nc\n", "a\nx\nc\n", Utc::now());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert_eq!(changes[0].line_number, 2);
    }

    #[test]
    fn equal_text_produces_no_changes() {
        let t = tracker(DiffStrategyKind::Myers);
        assert!(t.track("same\n", "same\n", Utc::now()).is_empty());
    }
}
