// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::engine::{MergeEngine, Reduction};
use crate::split::split;
use trajseg_core::{Label, SegError, StableRng, TieBreaker, argmax_rows};

/// Configuration for a seeded post-processing run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostProcessConfig {
    pub n_change_points: usize,
    pub seed: u64,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            n_change_points: 1,
            seed: 0,
        }
    }
}

impl PostProcessConfig {
    pub fn validate(&self) -> Result<(), SegError> {
        if self.n_change_points == usize::MAX {
            return Err(SegError::invalid_input(
                "PostProcessConfig requires n_change_points < usize::MAX",
            ));
        }
        Ok(())
    }

    pub fn engine(&self) -> MergeEngine {
        MergeEngine::new(self.n_change_points)
    }
}

/// Splits `labels` into runs and reduces them to `n_change_points` change
/// points, drawing every tie-break from `rng`.
pub fn post_process<L, R>(
    labels: &[L],
    n_change_points: usize,
    rng: &mut R,
) -> Result<Reduction<L>, SegError>
where
    L: Label,
    R: TieBreaker + ?Sized,
{
    let splits = split(labels)?;
    MergeEngine::new(n_change_points).reduce(splits, rng)
}

/// [`post_process`] with a [`StableRng`] seeded from `config.seed`.
pub fn post_process_with_config<L: Label>(
    labels: &[L],
    config: &PostProcessConfig,
) -> Result<Reduction<L>, SegError> {
    config.validate()?;
    let mut rng = StableRng::new(config.seed);
    let mut reduction = post_process(labels, config.n_change_points, &mut rng)?;
    reduction.diagnostics.seed = Some(config.seed);
    Ok(reduction)
}

/// Post-processes a row-major `[n, n_classes]` score matrix.
///
/// Each row is reduced to its highest-scoring class before splitting.
pub fn post_process_scores(
    scores: &[f64],
    n: usize,
    n_classes: usize,
    config: &PostProcessConfig,
) -> Result<Reduction<usize>, SegError> {
    let labels = argmax_rows(scores, n, n_classes)?;
    post_process_with_config(labels.as_slice(), config)
}

/// Change point and the two segment classes of a `k = 1` reduction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TwoSegmentPrediction<L> {
    pub change_point: usize,
    pub class_0: L,
    pub class_1: L,
}

impl<L: Label> TwoSegmentPrediction<L> {
    /// Collapses a reduction with one or two segments.
    ///
    /// A single segment yields `missing_change_point` and repeats its class
    /// for both sides.
    pub fn from_reduction(
        reduction: &Reduction<L>,
        missing_change_point: usize,
    ) -> Result<Self, SegError> {
        match (reduction.classes.as_slice(), reduction.change_points.as_slice()) {
            ([class], []) => Ok(Self {
                change_point: missing_change_point,
                class_0: *class,
                class_1: *class,
            }),
            ([class_0, class_1], [change_point]) => Ok(Self {
                change_point: *change_point,
                class_0: *class_0,
                class_1: *class_1,
            }),
            (classes, change_points) => Err(SegError::invalid_input(format!(
                "two-segment prediction requires 1 or 2 segments; got classes.len()={}, change_points.len()={}",
                classes.len(),
                change_points.len()
            ))),
        }
    }

    pub fn has_change_point(&self, missing_change_point: usize) -> bool {
        self.change_point != missing_change_point
    }
}
