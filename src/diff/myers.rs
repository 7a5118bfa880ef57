//! Classical Myers O(ND) shortest-edit-script diff. Tracks the `V` array for
//! each `d` step and reconstructs the edit script by backtracking through the
//! saved trace, per the textbook algorithm (Myers, "An O(ND) Difference
//! Algorithm and Its Variations", 1986). Only EQUAL/INSERT/DELETE are
//! emitted; adjacent opcodes of the same kind are coalesced before return.

use super::{Opcode, coalesce};

/// Computes the shortest edit script turning `old_lines` into `new_lines`.
pub fn compute(old_lines: &[String], new_lines: &[String]) -> Vec<Opcode> {
    let raw = shortest_edit_script(old_lines, new_lines);
    coalesce(raw)
}

/// One entry of the trace: the `V` array as it stood after the `d`-th step.
struct Trace {
    v: Vec<i64>,
}

fn shortest_edit_script(old: &[String], new: &[String]) -> Vec<Opcode> {
    let n = old.len() as i64;
    let m = new.len() as i64;
    let max = n + m;

    if max == 0 {
        return Vec::new();
    }

    let offset = max as usize;
    let mut v = vec![0i64; 2 * max as usize + 1];
    let mut trace: Vec<Trace> = Vec::new();

    'outer: for d in 0..=max {
        trace.push(Trace { v: v.clone() });
        let d = d as i64;
        let mut k = -d;
        while k <= d {
            let down = k == -d
                || (k != d && v[(offset as i64 + k - 1) as usize] < v[(offset as i64 + k + 1) as usize]);

            let mut x = if down {
                v[(offset as i64 + k + 1) as usize]
            } else {
                v[(offset as i64 + k - 1) as usize] + 1
            };
            let mut y = x - k;

            while x < n && y < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }

            v[(offset as i64 + k) as usize] = x;

            if x >= n && y >= m {
                break 'outer;
            }
            k += 2;
        }
    }

    backtrack(old, new, &trace, offset)
}

fn backtrack(old: &[String], new: &[String], trace: &[Trace], offset: usize) -> Vec<Opcode> {
    let n = old.len() as i64;
    let m = new.len() as i64;
    let mut x = n;
    let mut y = m;
    let mut ops: Vec<Opcode> = Vec::new();

    for d in (0..trace.len() as i64).rev() {
        let v = &trace[d as usize].v;
        let k = x - y;

        let down = k == -d
            || (k != d && v[(offset as i64 + k - 1) as usize] < v[(offset as i64 + k + 1) as usize]);

        let prev_k = if down { k + 1 } else { k - 1 };
        let prev_x = v[(offset as i64 + prev_k) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops.push(Opcode::Equal {
                old: (x - 1) as usize..x as usize,
                new: (y - 1) as usize..y as usize,
            });
            x -= 1;
            y -= 1;
        }

        if d > 0 {
            if down {
                ops.push(Opcode::Insert {
                    old: prev_x as usize..prev_x as usize,
                    new: prev_y as usize..(prev_y + 1) as usize,
                });
            } else {
                ops.push(Opcode::Delete {
                    old: prev_x as usize..(prev_x + 1) as usize,
                    new: prev_y as usize..prev_y as usize,
                });
            }
        }

        x = prev_x;
        y = prev_y;
    }

    let _ = (old, new);
    ops.reverse();
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffStrategyKind, reconstruct, test_support::round_trips};

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_line_replace_produces_delete_then_insert() {
        let old = lines(&["a", "b", "c"]);
        let new = lines(&["a", "x", "c"]);
        let ops = compute(&old, &new);
        // EQUAL a, {DELETE b, INSERT x} in some order, EQUAL c
        assert!(ops.iter().any(|o| matches!(o, Opcode::Delete { .. })));
        assert!(ops.iter().any(|o| matches!(o, Opcode::Insert { .. })));
        let rebuilt = reconstruct(&old, &new, &ops);
        assert_eq!(rebuilt, new);
    }

    #[test]
    fn identical_inputs_produce_single_equal_opcode() {
        let old = lines(&["a", "b", "c"]);
        let ops = compute(&old, &old);
        assert_eq!(ops.len(), 1);
        assert!(ops[0].is_equal());
    }

    #[test]
    fn empty_inputs_produce_no_opcodes() {
        assert!(compute(&[], &[]).is_empty());
    }

    #[test]
    fn round_trip_holds_for_varied_inputs() {
        round_trips(DiffStrategyKind::Myers, &["a", "b", "c"], &["a", "x", "c", "d"]);
        round_trips(DiffStrategyKind::Myers, &[], &["a", "b"]);
        round_trips(DiffStrategyKind::Myers, &["a", "b"], &[]);
        round_trips(DiffStrategyKind::Myers, &["a", "b", "c", "d"], &["d", "c", "b", "a"]);
    }

    #[test]
    fn only_equal_insert_delete_emitted() {
        let old = lines(&["a", "b"]);
        let new = lines(&["a", "x", "b"]);
        let ops = compute(&old, &new);
        for op in &ops {
            assert!(!matches!(op, Opcode::Modify { .. }));
        }
    }
}
