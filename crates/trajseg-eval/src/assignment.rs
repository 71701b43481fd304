// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use trajseg_core::SegError;

/// Optimal one-to-one matching between two change-point sets.
///
/// Minimizes the total absolute positional difference. Returns
/// `(true_index, predicted_index)` pairs sorted by `true_index`; exactly
/// `min(truth.len(), predicted.len())` pairs are produced.
pub fn assign_change_points(
    truth: &[usize],
    predicted: &[usize],
) -> Result<Vec<(usize, usize)>, SegError> {
    if truth.is_empty() || predicted.is_empty() {
        return Ok(vec![]);
    }

    let transposed = truth.len() > predicted.len();
    let (rows, cols) = if transposed {
        (predicted, truth)
    } else {
        (truth, predicted)
    };
    let cost = distance_matrix(rows, cols)?;
    let matched = solve_rectangular(&cost, rows.len(), cols.len())?;

    let mut pairs: Vec<(usize, usize)> = matched
        .into_iter()
        .map(|(row, col)| if transposed { (col, row) } else { (row, col) })
        .collect();
    pairs.sort_unstable();
    Ok(pairs)
}

fn distance_matrix(rows: &[usize], cols: &[usize]) -> Result<Vec<i64>, SegError> {
    let mut cost = Vec::with_capacity(rows.len() * cols.len());
    for &row in rows {
        for &col in cols {
            let diff = i64::try_from(row.abs_diff(col)).map_err(|_| {
                SegError::resource_limit(format!(
                    "change-point distance |{row} - {col}| does not fit into i64"
                ))
            })?;
            cost.push(diff);
        }
    }
    Ok(cost)
}

/// Hungarian algorithm with row/column potentials for `n <= m`.
fn solve_rectangular(cost: &[i64], n: usize, m: usize) -> Result<Vec<(usize, usize)>, SegError> {
    const UNREACHED: i64 = i64::MAX / 4;

    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; m + 1];
    let mut owner = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut col0 = 0usize;
        let mut min_slack = vec![UNREACHED; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[col0] = true;
            let row0 = owner[col0];
            let mut delta = UNREACHED;
            let mut col1 = 0usize;
            for col in 1..=m {
                if used[col] {
                    continue;
                }
                let reduced = cost[(row0 - 1) * m + (col - 1)] - u[row0] - v[col];
                if reduced < min_slack[col] {
                    min_slack[col] = reduced;
                    way[col] = col0;
                }
                if min_slack[col] < delta {
                    delta = min_slack[col];
                    col1 = col;
                }
            }
            if col1 == 0 {
                return Err(SegError::numerical_issue(
                    "assignment solver found no augmenting column",
                ));
            }

            for col in 0..=m {
                if used[col] {
                    u[owner[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_slack[col] -= delta;
                }
            }
            col0 = col1;
            if owner[col0] == 0 {
                break;
            }
        }

        loop {
            let col1 = way[col0];
            owner[col0] = owner[col1];
            col0 = col1;
            if col0 == 0 {
                break;
            }
        }
    }

    Ok((1..=m)
        .filter(|&col| owner[col] != 0)
        .map(|col| (owner[col] - 1, col - 1))
        .collect())
}
