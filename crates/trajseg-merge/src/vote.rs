// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use trajseg_core::{Label, SegError, TieBreaker};

/// Distinct values of `values` with their counts, in first-occurrence order.
pub fn value_counts<L: Label>(values: &[L]) -> Vec<(L, usize)> {
    let mut counts: Vec<(L, usize)> = Vec::new();
    for &value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    counts
}

/// Distinct values ranked by descending count.
///
/// Values with equal counts keep their first-occurrence order.
pub fn ranked_values<L: Label>(values: &[L]) -> Vec<(L, usize)> {
    let mut counts = value_counts(values);
    counts.sort_by(|left, right| right.1.cmp(&left.1));
    counts
}

/// Every value that reaches the highest count, in first-occurrence order.
pub fn majority_candidates<L: Label>(values: &[L]) -> Vec<L> {
    let counts = value_counts(values);
    let Some(max_count) = counts.iter().map(|(_, count)| *count).max() else {
        return vec![];
    };
    counts
        .into_iter()
        .filter(|(_, count)| *count == max_count)
        .map(|(value, _)| value)
        .collect()
}

/// Most frequent value of `values`.
///
/// Ties are broken uniformly at random with one draw from `rng`; a unique
/// maximum consumes no draw.
pub fn majority_vote<L, R>(values: &[L], rng: &mut R) -> Result<L, SegError>
where
    L: Label,
    R: TieBreaker + ?Sized,
{
    let (value, _) = majority_vote_with_tie(values, rng)?;
    Ok(value)
}

/// Like [`majority_vote`] but also reports whether a random tie-break was used.
pub fn majority_vote_with_tie<L, R>(values: &[L], rng: &mut R) -> Result<(L, bool), SegError>
where
    L: Label,
    R: TieBreaker + ?Sized,
{
    let candidates = majority_candidates(values);
    match candidates.len() {
        0 => Err(SegError::invalid_input(
            "majority vote requires a non-empty subsequence",
        )),
        1 => Ok((candidates[0], false)),
        len => {
            let idx = rng.pick(len)?;
            Ok((candidates[idx], true))
        }
    }
}

/// Fraction of `values` equal to `value`; `0.0` when absent or empty.
pub fn abundance<L: Label>(value: L, values: &[L]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let count = values.iter().filter(|&&candidate| candidate == value).count();
    count as f64 / values.len() as f64
}
