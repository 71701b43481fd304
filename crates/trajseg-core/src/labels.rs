// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SegError;
use std::fmt::Debug;

/// Value stored at each position of a label sequence.
///
/// Integer class ids and the `f64` levels of a piecewise-constant fit both
/// qualify. Equality is the only relation the post-processing needs.
pub trait Label: Copy + PartialEq + Debug {
    /// Whether the value can take part in equality-based splitting.
    fn is_valid(&self) -> bool {
        true
    }
}

macro_rules! impl_plain_label {
    ($($ty:ty),* $(,)?) => {
        $(impl Label for $ty {})*
    };
}

impl_plain_label!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, bool, char);

impl Label for f32 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl Label for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

/// Validates a label sequence: non-empty and every value usable.
pub fn validate_labels<L: Label>(labels: &[L]) -> Result<(), SegError> {
    if labels.is_empty() {
        return Err(SegError::invalid_input(
            "label sequence must be non-empty; got length 0",
        ));
    }
    if let Some((idx, value)) = labels
        .iter()
        .enumerate()
        .find(|(_, value)| !value.is_valid())
    {
        return Err(SegError::invalid_input(format!(
            "label sequence contains an invalid value at index {idx}: {value:?}"
        )));
    }
    Ok(())
}

/// Reduces a row-major `[n, c]` score matrix to one class id per row.
///
/// The first maximum wins when several classes share the top score.
pub fn argmax_rows(scores: &[f64], n: usize, c: usize) -> Result<Vec<usize>, SegError> {
    if n == 0 {
        return Err(SegError::invalid_input("argmax_rows requires n >= 1"));
    }
    if c == 0 {
        return Err(SegError::invalid_input("argmax_rows requires c >= 1"));
    }
    let expected_len = n
        .checked_mul(c)
        .ok_or_else(|| SegError::invalid_input("n*c overflow while validating score shape"))?;
    if scores.len() != expected_len {
        return Err(SegError::invalid_input(format!(
            "score length mismatch: got {}, expected {expected_len} (n={n}, c={c})",
            scores.len()
        )));
    }

    let mut out = Vec::with_capacity(n);
    for (row_idx, row) in scores.chunks_exact(c).enumerate() {
        let mut best = 0usize;
        for (class, &score) in row.iter().enumerate() {
            if !score.is_finite() {
                return Err(SegError::invalid_input(format!(
                    "scores must be finite; row={row_idx}, class={class} has {score}"
                )));
            }
            if score > row[best] {
                best = class;
            }
        }
        out.push(best);
    }
    Ok(out)
}
