// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::Segmenter;
use trajseg_core::SegError;

/// Piecewise-constant approximation of a signal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PiecewiseFit {
    /// Segment end indices; the last entry is the signal length.
    pub breakpoints: Vec<usize>,
    /// Mean level of each segment.
    pub levels: Vec<f64>,
    /// Per-position fitted value, `levels` expanded over each segment.
    pub fitted: Vec<f64>,
}

impl PiecewiseFit {
    /// Segments `signal` with `segmenter` and replaces every segment by its
    /// mean.
    pub fn fit<S: Segmenter + ?Sized>(signal: &[f64], segmenter: &S) -> Result<Self, SegError> {
        let breakpoints = segmenter.segment(signal)?;
        Self::from_breakpoints(signal, breakpoints)
    }

    pub fn from_breakpoints(signal: &[f64], breakpoints: Vec<usize>) -> Result<Self, SegError> {
        validate_breakpoints(&breakpoints, signal.len())?;
        let mut levels = Vec::with_capacity(breakpoints.len());
        let mut fitted = Vec::with_capacity(signal.len());
        let mut start = 0usize;
        for &end in &breakpoints {
            let level = mean(&signal[start..end])?;
            levels.push(level);
            fitted.extend(std::iter::repeat_n(level, end - start));
            start = end;
        }
        Ok(Self {
            breakpoints,
            levels,
            fitted,
        })
    }

    pub fn change_points(&self) -> &[usize] {
        &self.breakpoints[..self.breakpoints.len().saturating_sub(1)]
    }
}

/// Per-position fitted values for `signal` split at `breakpoints`.
pub fn fit_segments(signal: &[f64], breakpoints: &[usize]) -> Result<Vec<f64>, SegError> {
    Ok(PiecewiseFit::from_breakpoints(signal, breakpoints.to_vec())?.fitted)
}

/// Segment lengths for a sequence of `length` values cut at `change_points`.
pub fn lengths_from_change_points(
    change_points: &[usize],
    length: usize,
) -> Result<Vec<usize>, SegError> {
    let mut lengths = Vec::with_capacity(change_points.len() + 1);
    let mut start = 0usize;
    for (idx, &cp) in change_points.iter().enumerate() {
        if cp < start || cp > length {
            return Err(SegError::invalid_input(format!(
                "change points must be non-decreasing within [0, {length}]; change_points[{idx}]={cp}"
            )));
        }
        lengths.push(cp - start);
        start = cp;
    }
    lengths.push(length - start);
    Ok(lengths)
}

/// Cuts `values` into consecutive chunks at `indices`.
pub fn split_at_indices<'a, T>(
    values: &'a [T],
    indices: &[usize],
) -> Result<Vec<&'a [T]>, SegError> {
    let lengths = lengths_from_change_points(indices, values.len())?;
    let mut chunks = Vec::with_capacity(lengths.len());
    let mut rest = values;
    for len in lengths {
        let (head, tail) = rest.split_at(len);
        chunks.push(head);
        rest = tail;
    }
    Ok(chunks)
}

/// Means of `signal[..change_point]` and `signal[change_point..]`.
pub fn segment_means(signal: &[f64], change_point: usize) -> Result<(f64, f64), SegError> {
    if change_point == 0 || change_point >= signal.len() {
        return Err(SegError::invalid_input(format!(
            "change point must lie in [1, {}]; got {change_point}",
            signal.len().saturating_sub(1)
        )));
    }
    Ok((
        mean(&signal[..change_point])?,
        mean(&signal[change_point..])?,
    ))
}

fn mean(values: &[f64]) -> Result<f64, SegError> {
    if values.is_empty() {
        return Err(SegError::invalid_input("cannot average an empty segment"));
    }
    let value = values.iter().sum::<f64>() / values.len() as f64;
    if !value.is_finite() {
        return Err(SegError::numerical_issue(format!(
            "segment mean is not finite: {value}"
        )));
    }
    Ok(value)
}

fn validate_breakpoints(breakpoints: &[usize], n: usize) -> Result<(), SegError> {
    if breakpoints.last() != Some(&n) {
        return Err(SegError::invalid_input(format!(
            "breakpoints must end with n={n}; got {breakpoints:?}"
        )));
    }
    let mut prev = 0usize;
    for (idx, &bp) in breakpoints.iter().enumerate() {
        if bp <= prev {
            return Err(SegError::invalid_input(format!(
                "breakpoints must be strictly increasing and > 0; breakpoints[{idx}]={bp}"
            )));
        }
        prev = bp;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        PiecewiseFit, fit_segments, lengths_from_change_points, segment_means, split_at_indices,
    };
    use crate::{KernelFitConfig, KernelSegmenter};
    use trajseg_core::SegError;

    fn assert_approx_eq(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= 1e-12,
            "expected {expected}, got {actual} (delta={delta})"
        );
    }

    #[test]
    fn fit_segments_replaces_segments_by_their_means() {
        let signal = [1.0, 3.0, 10.0, 12.0, 14.0];
        let fitted = fit_segments(&signal, &[2, 5]).expect("fit should succeed");
        assert_eq!(fitted, vec![2.0, 2.0, 12.0, 12.0, 12.0]);
    }

    #[test]
    fn breakpoints_must_cover_the_signal() {
        let signal = [1.0, 2.0, 3.0];
        let err = fit_segments(&signal, &[2]).expect_err("missing terminal breakpoint");
        assert!(matches!(err, SegError::InvalidInput(_)));
        let err = fit_segments(&signal, &[2, 2, 3]).expect_err("repeated breakpoint");
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn piecewise_fit_runs_the_segmenter() {
        let mut signal = vec![0.1; 8];
        signal.extend(vec![0.9; 8]);
        let segmenter =
            KernelSegmenter::new(KernelFitConfig::default()).expect("default config should build");
        let fit = PiecewiseFit::fit(&signal, &segmenter).expect("fit should succeed");
        assert_eq!(fit.breakpoints, vec![8, 16]);
        assert_eq!(fit.change_points(), &[8]);
        assert_eq!(fit.levels.len(), 2);
        assert_approx_eq(fit.levels[0], 0.1);
        assert_approx_eq(fit.levels[1], 0.9);
        assert_eq!(fit.fitted.len(), signal.len());
    }

    #[test]
    fn lengths_cover_the_sequence() {
        assert_eq!(
            lengths_from_change_points(&[3, 7], 9).expect("valid change points"),
            vec![3, 4, 2]
        );
        assert_eq!(
            lengths_from_change_points(&[], 4).expect("no change points"),
            vec![4]
        );
        let err = lengths_from_change_points(&[5, 3], 9).expect_err("decreasing must fail");
        assert!(matches!(err, SegError::InvalidInput(_)));
    }

    #[test]
    fn split_at_indices_returns_borrowed_chunks() {
        let values = [0u8, 0, 0, 1, 1, 2];
        let chunks = split_at_indices(&values, &[3, 5]).expect("split should succeed");
        assert_eq!(chunks, vec![&values[..3], &values[3..5], &values[5..]]);
    }

    #[test]
    fn segment_means_average_each_side() {
        let signal = [0.0, 1.0, 2.0, 10.0, 20.0];
        let (left, right) = segment_means(&signal, 3).expect("means should succeed");
        assert_approx_eq(left, 1.0);
        assert_approx_eq(right, 15.0);

        let err = segment_means(&signal, 0).expect_err("empty left side must fail");
        assert!(matches!(err, SegError::InvalidInput(_)));
        let err = segment_means(&signal, 5).expect_err("empty right side must fail");
        assert!(matches!(err, SegError::InvalidInput(_)));
    }
}
