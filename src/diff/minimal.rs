//! Minimal edit-distance diff: a classical O(N*M) dynamic-programming edit
//! matrix with INSERT, DELETE, and REPLACE each costing 1, backtracked from
//! (m, n) to emit the cheapest possible script. Unlike Myers, this strategy
//! can emit MODIFY opcodes directly (a REPLACE step), which is why it tends
//! to produce fewer, coarser hunks on heavily-edited text. Ties are broken
//! by preferring MODIFY over DELETE over INSERT.

use super::{Opcode, coalesce};

pub fn compute(old_lines: &[String], new_lines: &[String]) -> Vec<Opcode> {
    let n = old_lines.len();
    let m = new_lines.len();

    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in 0..=n {
        dp[i][0] = i;
    }
    for j in 0..=m {
        dp[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            if old_lines[i - 1] == new_lines[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            } else {
                let replace = dp[i - 1][j - 1] + 1;
                let delete = dp[i - 1][j] + 1;
                let insert = dp[i][j - 1] + 1;
                dp[i][j] = replace.min(delete).min(insert);
            }
        }
    }

    let mut ops = Vec::new();
    let mut i = n;
    let mut j = m;
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_lines[i - 1] == new_lines[j - 1] {
            ops.push(Opcode::Equal { old: i - 1..i, new: j - 1..j });
            i -= 1;
            j -= 1;
            continue;
        }

        let replace = if i > 0 && j > 0 { Some(dp[i - 1][j - 1] + 1) } else { None };
        let delete = if i > 0 { Some(dp[i - 1][j] + 1) } else { None };
        let insert = if j > 0 { Some(dp[i][j - 1] + 1) } else { None };
        let here = dp[i][j];

        // MODIFY > DELETE > INSERT on ties.
        if replace == Some(here) {
            ops.push(Opcode::Modify { old: i - 1..i, new: j - 1..j });
            i -= 1;
            j -= 1;
        } else if delete == Some(here) {
            ops.push(Opcode::Delete { old: i - 1..i, new: j..j });
            i -= 1;
        } else if insert == Some(here) {
            ops.push(Opcode::Insert { old: i..i, new: j - 1..j });
            j -= 1;
        } else {
            unreachable!("dp backtrack must match one of replace/delete/insert");
        }
    }

    ops.reverse();
    coalesce(ops)
}
