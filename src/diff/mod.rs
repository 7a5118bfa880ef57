//! Pure line-sequence alignment: three pluggable strategies (Myers, Patience,
//! Minimal DP) all implementing the same `DiffStrategy` shape so the
//! `LineTracker` and `MergeEngine` never depend on which one produced an
//! opcode list. Strategy selection is a stateless tagged enum rather than a
//! runtime class hierarchy, per the design notes.

pub mod minimal;
pub mod myers;
pub mod patience;

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single diff instruction over half-open old/new ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    Equal { old: Range<usize>, new: Range<usize> },
    Insert { old: Range<usize>, new: Range<usize> },
    Delete { old: Range<usize>, new: Range<usize> },
    Modify { old: Range<usize>, new: Range<usize> },
}

impl Opcode {
    pub fn old_range(&self) -> Range<usize> {
        match self {
            Opcode::Equal { old, .. }
            | Opcode::Insert { old, .. }
            | Opcode::Delete { old, .. }
            | Opcode::Modify { old, .. } => old.clone(),
        }
    }

    pub fn new_range(&self) -> Range<usize> {
        match self {
            Opcode::Equal { new, .. }
            | Opcode::Insert { new, .. }
            | Opcode::Delete { new, .. }
            | Opcode::Modify { new, .. } => new.clone(),
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, Opcode::Equal { .. })
    }
}

/// Which concrete algorithm computed a set of opcodes. Each strategy is a
/// stateless value: `compute` takes no `&mut self` and has no hidden state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffStrategyKind {
    Myers,
    Patience,
    Minimal,
}

impl DiffStrategyKind {
    pub fn compute(&self, old_lines: &[String], new_lines: &[String]) -> Vec<Opcode> {
        match self {
            DiffStrategyKind::Myers => myers::compute(old_lines, new_lines),
            DiffStrategyKind::Patience => patience::compute(old_lines, new_lines),
            DiffStrategyKind::Minimal => minimal::compute(old_lines, new_lines),
        }
    }
}

/// Reconstructs the new-side text from `old_lines`/`new_lines` and a set of
/// opcodes describing how to get from one to the other. Opcode ranges alone
/// don't carry content, so reconstruction borrows from whichever side an
/// opcode's `new` range indexes into. This is the diff round-trip law from
/// §8: for any strategy, `reconstruct(old, new, compute(old, new)) == new`.
pub fn reconstruct(old_lines: &[String], new_lines: &[String], opcodes: &[Opcode]) -> Vec<String> {
    let mut out = Vec::new();
    for op in opcodes {
        match op {
            Opcode::Equal { new, .. } => out.extend(new_lines[new.clone()].iter().cloned()),
            Opcode::Insert { new, .. } => out.extend(new_lines[new.clone()].iter().cloned()),
            Opcode::Modify { new, .. } => out.extend(new_lines[new.clone()].iter().cloned()),
            Opcode::Delete { .. } => {}
        }
    }
    out
}

/// Merges adjacent opcodes of the same kind into one, as every strategy is
/// required to do before returning its opcode list.
pub(crate) fn coalesce(opcodes: Vec<Opcode>) -> Vec<Opcode> {
    let mut out: Vec<Opcode> = Vec::with_capacity(opcodes.len());
    for op in opcodes {
        if op.old_range().is_empty() && op.new_range().is_empty() {
            continue;
        }
        match (out.last_mut(), &op) {
            (Some(Opcode::Equal { old: po, new: pn }), Opcode::Equal { old, new })
            | (Some(Opcode::Insert { old: po, new: pn }), Opcode::Insert { old, new })
            | (Some(Opcode::Delete { old: po, new: pn }), Opcode::Delete { old, new })
            | (Some(Opcode::Modify { old: po, new: pn }), Opcode::Modify { old, new })
                if po.end == old.start && pn.end == new.start =>
            {
                po.end = old.end;
                pn.end = new.end;
            }
            _ => out.push(op),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn round_trips(kind: DiffStrategyKind, old: &[&str], new: &[&str]) {
        let old_lines: Vec<String> = old.iter().map(|s| s.to_string()).collect();
        let new_lines: Vec<String> = new.iter().map(|s| s.to_string()).collect();
        let ops = kind.compute(&old_lines, &new_lines);
        let rebuilt = reconstruct(&old_lines, &new_lines, &ops);
        assert_eq!(rebuilt, new_lines, "{kind:?} failed to round-trip");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn myers_round_trips_for_arbitrary_lines(old: Vec<String>, new: Vec<String>) -> bool {
        reconstruct(&old, &new, &DiffStrategyKind::Myers.compute(&old, &new)) == new
    }

    #[quickcheck]
    fn patience_round_trips_for_arbitrary_lines(old: Vec<String>, new: Vec<String>) -> bool {
        reconstruct(&old, &new, &DiffStrategyKind::Patience.compute(&old, &new)) == new
    }

    #[quickcheck]
    fn minimal_round_trips_for_arbitrary_lines(old: Vec<String>, new: Vec<String>) -> bool {
        reconstruct(&old, &new, &DiffStrategyKind::Minimal.compute(&old, &new)) == new
    }
}
