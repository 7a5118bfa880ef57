//! Patience diff: anchors on lines that occur exactly once in both the old
//! and new ranges, takes the longest increasing subsequence of those anchors'
//! new-side indices, and recurses on the gaps between anchors. A subrange
//! with no unique anchor falls back to Myers. Produces more human-readable
//! diffs than plain Myers on code with repeated lines and moved blocks.

use std::collections::HashMap;
use std::ops::Range;

use super::{Opcode, coalesce, myers};

pub fn compute(old_lines: &[String], new_lines: &[String]) -> Vec<Opcode> {
    let mut ops = Vec::new();
    diff_range(old_lines, new_lines, 0..old_lines.len(), 0..new_lines.len(), &mut ops);
    coalesce(ops)
}

fn diff_range(
    old_lines: &[String],
    new_lines: &[String],
    old_range: Range<usize>,
    new_range: Range<usize>,
    out: &mut Vec<Opcode>,
) {
    if old_range.is_empty() && new_range.is_empty() {
        return;
    }
    if old_range.is_empty() {
        out.push(Opcode::Insert { old: old_range.start..old_range.start, new: new_range });
        return;
    }
    if new_range.is_empty() {
        out.push(Opcode::Delete { old: old_range, new: new_range.start..new_range.start });
        return;
    }

    match unique_anchors(old_lines, new_lines, &old_range, &new_range) {
        Some(anchors) if !anchors.is_empty() => {
            let mut prev_old = old_range.start;
            let mut prev_new = new_range.start;
            for (ao, an) in anchors {
                diff_range(old_lines, new_lines, prev_old..ao, prev_new..an, out);
                out.push(Opcode::Equal { old: ao..ao + 1, new: an..an + 1 });
                prev_old = ao + 1;
                prev_new = an + 1;
            }
            diff_range(old_lines, new_lines, prev_old..old_range.end, prev_new..new_range.end, out);
        }
        _ => {
            let old_slice = &old_lines[old_range.clone()];
            let new_slice = &new_lines[new_range.clone()];
            let sub_ops = myers::compute(old_slice, new_slice);
            for op in sub_ops {
                out.push(shift(op, old_range.start, new_range.start));
            }
        }
    }
}

fn shift(op: Opcode, old_offset: usize, new_offset: usize) -> Opcode {
    let shift_range = |r: Range<usize>, off: usize| (r.start + off)..(r.end + off);
    match op {
        Opcode::Equal { old, new } => Opcode::Equal { old: shift_range(old, old_offset), new: shift_range(new, new_offset) },
        Opcode::Insert { old, new } => Opcode::Insert { old: shift_range(old, old_offset), new: shift_range(new, new_offset) },
        Opcode::Delete { old, new } => Opcode::Delete { old: shift_range(old, old_offset), new: shift_range(new, new_offset) },
        Opcode::Modify { old, new } => Opcode::Modify { old: shift_range(old, old_offset), new: shift_range(new, new_offset) },
    }
}

/// Finds lines that occur exactly once in `old_range` and exactly once in
/// `new_range` with matching content, then returns the subset of those
/// matches forming the longest increasing subsequence of new-side indices
/// (so the anchors stay in relative order on both sides). Returns `None`
/// when no candidate pairs exist at all.
fn unique_anchors(
    old_lines: &[String],
    new_lines: &[String],
    old_range: &Range<usize>,
    new_range: &Range<usize>,
) -> Option<Vec<(usize, usize)>> {
    let mut old_counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for i in old_range.clone() {
        let entry = old_counts.entry(old_lines[i].as_str()).or_insert((0, i));
        entry.0 += 1;
        entry.1 = i;
    }
    let mut new_counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for j in new_range.clone() {
        let entry = new_counts.entry(new_lines[j].as_str()).or_insert((0, j));
        entry.0 += 1;
        entry.1 = j;
    }

    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (line, (count, old_idx)) in &old_counts {
        if *count != 1 {
            continue;
        }
        if let Some((new_count, new_idx)) = new_counts.get(line) {
            if *new_count == 1 {
                pairs.push((*old_idx, *new_idx));
            }
        }
    }

    if pairs.is_empty() {
        return None;
    }

    pairs.sort_by_key(|&(old_idx, _)| old_idx);
    Some(longest_increasing_subsequence(&pairs))
}

/// Standard patience-sorting LIS on the `new`-side index of each pair,
/// given pairs already sorted by `old`-side index. O(N log N).
fn longest_increasing_subsequence(pairs: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut piles_top: Vec<usize> = Vec::new(); // index into pairs, tail of each pile
    let mut predecessors: Vec<Option<usize>> = vec![None; pairs.len()];

    for (i, &(_, new_idx)) in pairs.iter().enumerate() {
        let pos = piles_top.partition_point(|&p| pairs[p].1 < new_idx);
        if pos > 0 {
            predecessors[i] = Some(piles_top[pos - 1]);
        }
        if pos == piles_top.len() {
            piles_top.push(i);
        } else {
            piles_top[pos] = i;
        }
    }

    let mut result = Vec::new();
    let mut cur = piles_top.last().copied();
    while let Some(i) = cur {
        result.push(pairs[i]);
        cur = predecessors[i];
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffStrategyKind, reconstruct, test_support::round_trips};

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn anchors_on_unique_lines() {
        let old = lines(&["fn a()", "unique_marker", "fn b()"]);
        let new = lines(&["fn a2()", "unique_marker", "fn b2()"]);
        let ops = compute(&old, &new);
        assert!(ops.iter().any(|o| o.is_equal()));
        let rebuilt = reconstruct(&old, &new, &ops);
        assert_eq!(rebuilt, new);
    }

    #[test]
    fn no_unique_anchor_falls_back_to_myers_result() {
        let old = lines(&["a", "a", "a"]);
        let new = lines(&["a", "a"]);
        let ops = compute(&old, &new);
        let rebuilt = reconstruct(&old, &new, &ops);
        assert_eq!(rebuilt, new);
    }

    #[test]
    fn round_trip_holds() {
        round_trips(DiffStrategyKind::Patience, &["a", "b", "c", "d"], &["a", "x", "c", "d", "e"]);
        round_trips(DiffStrategyKind::Patience, &[], &[]);
        round_trips(DiffStrategyKind::Patience, &["only"], &[]);
        round_trips(
            DiffStrategyKind::Patience,
            &["one", "two", "three", "two", "four"],
            &["zero", "one", "three", "four"],
        );
    }
}
