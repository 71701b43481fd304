// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Scoring of predicted change points and segment classes against ground
//! truth.

pub mod assignment;

pub use assignment::assign_change_points;

use trajseg_core::{Label, SegError};
use trajseg_merge::TwoSegmentPrediction;

/// Distance below which a matched change point counts as found.
pub const DEFAULT_CHANGE_POINT_THRESHOLD: usize = 5;

/// Outcome of scoring one trajectory's change points.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangePointEvaluation {
    /// Squared positional error of every true positive, in true-index order.
    pub squared_error: Vec<f64>,
    pub tp: usize,
    pub fp: usize,
    #[cfg_attr(feature = "serde", serde(rename = "fn"))]
    pub fn_: usize,
}

impl ChangePointEvaluation {
    pub fn jaccard(&self) -> Result<f64, SegError> {
        jaccard_index(self.tp, self.fp, self.fn_)
    }
}

/// Scores `predicted` against `truth` after optimal assignment.
///
/// Size imbalance is charged first: surplus predictions are false positives
/// and surplus truths false negatives. A matched pair is a true positive when
/// its distance is strictly below `threshold`; otherwise it is both a false
/// positive and a false negative.
pub fn evaluate_change_points(
    truth: &[usize],
    predicted: &[usize],
    threshold: usize,
) -> Result<ChangePointEvaluation, SegError> {
    let mut evaluation = ChangePointEvaluation {
        fp: predicted.len().saturating_sub(truth.len()),
        fn_: truth.len().saturating_sub(predicted.len()),
        ..ChangePointEvaluation::default()
    };

    for (true_idx, pred_idx) in assign_change_points(truth, predicted)? {
        let difference = truth[true_idx].abs_diff(predicted[pred_idx]);
        if difference < threshold {
            evaluation.tp += 1;
            let difference = difference as f64;
            evaluation.squared_error.push(difference * difference);
        } else {
            evaluation.fp += 1;
            evaluation.fn_ += 1;
        }
    }

    Ok(evaluation)
}

/// Jaccard (Tanimoto) index `tp / (tp + fp + fn)`.
///
/// Undefined when all three counts are zero; that case is an error.
pub fn jaccard_index(tp: usize, fp: usize, fn_: usize) -> Result<f64, SegError> {
    let denominator = tp
        .checked_add(fp)
        .and_then(|sum| sum.checked_add(fn_))
        .ok_or_else(|| SegError::resource_limit("jaccard denominator overflow"))?;
    if denominator == 0 {
        return Err(SegError::invalid_input(
            "jaccard index is undefined when tp, fp and fn are all zero",
        ));
    }
    Ok(tp as f64 / denominator as f64)
}

/// Root-mean-squared error between paired change-point positions.
pub fn change_point_rmse(predicted: &[usize], truth: &[usize]) -> Result<f64, SegError> {
    validate_same_len(predicted.len(), truth.len(), "change point")?;
    let total = predicted
        .iter()
        .zip(truth)
        .map(|(&pred, &true_cp)| {
            let diff = pred.abs_diff(true_cp) as f64;
            diff * diff
        })
        .sum::<f64>();
    Ok((total / predicted.len() as f64).sqrt())
}

/// Micro-averaged F1 over per-position class predictions.
///
/// Every position carries exactly one class, so each mismatch is one false
/// positive for the predicted class and one false negative for the true one.
pub fn micro_f1<L: Label>(predicted: &[L], truth: &[L]) -> Result<f64, SegError> {
    validate_same_len(predicted.len(), truth.len(), "class")?;
    let tp = predicted
        .iter()
        .zip(truth)
        .filter(|(pred, true_class)| pred == true_class)
        .count();
    let mismatches = predicted.len() - tp;
    let (fp, fn_) = (mismatches, mismatches);

    let precision = tp as f64 / (tp + fp) as f64;
    let recall = tp as f64 / (tp + fn_) as f64;
    if precision + recall == 0.0 {
        return Ok(0.0);
    }
    Ok(2.0 * precision * recall / (precision + recall))
}

/// Aggregate metrics for two-segment predictions.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationMetrics {
    pub change_point_rmse: f64,
    pub class_f1: f64,
}

/// RMSE over change points plus micro-F1 over the concatenated segment-0 and
/// segment-1 classes.
///
/// Predictions without a change point are expected to carry `0` as their
/// change point, as built by `TwoSegmentPrediction::from_reduction(_, 0)`.
pub fn segmentation_metrics<L: Label>(
    predicted: &[TwoSegmentPrediction<L>],
    truth: &[TwoSegmentPrediction<L>],
) -> Result<SegmentationMetrics, SegError> {
    validate_same_len(predicted.len(), truth.len(), "prediction")?;

    let pred_cps: Vec<usize> = predicted.iter().map(|p| p.change_point).collect();
    let true_cps: Vec<usize> = truth.iter().map(|t| t.change_point).collect();
    let pred_classes: Vec<L> = predicted
        .iter()
        .map(|p| p.class_0)
        .chain(predicted.iter().map(|p| p.class_1))
        .collect();
    let true_classes: Vec<L> = truth
        .iter()
        .map(|t| t.class_0)
        .chain(truth.iter().map(|t| t.class_1))
        .collect();

    Ok(SegmentationMetrics {
        change_point_rmse: change_point_rmse(&pred_cps, &true_cps)?,
        class_f1: micro_f1(&pred_classes, &true_classes)?,
    })
}

/// Running totals of [`ChangePointEvaluation`]s over many trajectories.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationTally {
    pub trajectories: usize,
    pub tp: usize,
    pub fp: usize,
    #[cfg_attr(feature = "serde", serde(rename = "fn"))]
    pub fn_: usize,
    pub squared_error: Vec<f64>,
}

impl EvaluationTally {
    pub fn add(&mut self, evaluation: &ChangePointEvaluation) -> Result<(), SegError> {
        let overflow = || SegError::resource_limit("evaluation tally overflow");
        self.trajectories = self.trajectories.checked_add(1).ok_or_else(overflow)?;
        self.tp = self.tp.checked_add(evaluation.tp).ok_or_else(overflow)?;
        self.fp = self.fp.checked_add(evaluation.fp).ok_or_else(overflow)?;
        self.fn_ = self.fn_.checked_add(evaluation.fn_).ok_or_else(overflow)?;
        self.squared_error
            .extend_from_slice(evaluation.squared_error.as_slice());
        Ok(())
    }

    pub fn jaccard(&self) -> Result<f64, SegError> {
        jaccard_index(self.tp, self.fp, self.fn_)
    }

    /// RMSE over true positives; `None` before the first one.
    pub fn rmse(&self) -> Option<f64> {
        if self.squared_error.is_empty() {
            return None;
        }
        let mean = self.squared_error.iter().sum::<f64>() / self.squared_error.len() as f64;
        Some(mean.sqrt())
    }
}

fn validate_same_len(predicted: usize, truth: usize, what: &str) -> Result<(), SegError> {
    if predicted == 0 {
        return Err(SegError::invalid_input(format!(
            "{what} sequences must be non-empty"
        )));
    }
    if predicted != truth {
        return Err(SegError::invalid_input(format!(
            "{what} sequences must share length; got predicted={predicted}, true={truth}"
        )));
    }
    Ok(())
}

/// Evaluation crate name helper.
pub fn crate_name() -> &'static str {
    "trajseg-eval"
}
