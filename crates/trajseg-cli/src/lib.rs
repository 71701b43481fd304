// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Pipeline glue behind the `trajseg` binary: prediction inputs, config
//! documents, challenge-format records and batch scoring.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use trajseg_core::{SegError, argmax_rows};
use trajseg_eval::{ChangePointEvaluation, EvaluationTally, evaluate_change_points};
use trajseg_fit::{
    KernelFitConfig, KernelSegmenter, PiecewiseFit, Segmenter, Stopping, segment_means,
};
use trajseg_merge::{
    PostProcessConfig, Reduction, TwoSegmentPrediction, post_process_stream, reduce_batch,
};

/// Change point written when a prediction collapses to a single segment.
pub const DEFAULT_MISSING_CHANGE_POINT: usize = 100;
/// Minimum segment length of the two-sided alpha fit.
pub const ALPHA_MIN_SEGMENT_LEN: usize = 5;
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
const CONFIG_KIND: &str = "pipeline_config";

/// Challenge export settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub dim: usize,
    pub missing_change_point: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dim: 1,
            missing_change_point: DEFAULT_MISSING_CHANGE_POINT,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), SegError> {
        if self.dim == 0 {
            return Err(SegError::invalid_input(
                "ExportConfig.dim must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// Every knob of a post-processing run, as read from a config file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub postprocess: PostProcessConfig,
    pub fit: KernelFitConfig,
    pub export: ExportConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), SegError> {
        self.postprocess.validate()?;
        self.fit.validate()?;
        self.export.validate()
    }
}

/// Parses a bare config object or a `pipeline_config` envelope.
pub fn parse_pipeline_config(raw: &str) -> Result<PipelineConfig, SegError> {
    let direct_error = match serde_json::from_str::<PipelineConfig>(raw) {
        Ok(config) => {
            config.validate()?;
            return Ok(config);
        }
        Err(err) => err,
    };

    let value: Value = serde_json::from_str(raw)
        .map_err(|err| SegError::invalid_input(format!("invalid config JSON: {err}")))?;
    let Some(envelope) = value
        .as_object()
        .filter(|obj| obj.get("kind").and_then(Value::as_str) == Some(CONFIG_KIND))
    else {
        return Err(SegError::invalid_input(format!(
            "failed to parse config: {direct_error}"
        )));
    };

    if let Some(version) = envelope.get("schema_version") {
        let version = version.as_u64().ok_or_else(|| {
            SegError::invalid_input("config envelope schema_version must be an integer")
        })?;
        if version > u64::from(CONFIG_SCHEMA_VERSION) {
            return Err(SegError::not_supported(format!(
                "config schema_version={version} is newer than supported version {CONFIG_SCHEMA_VERSION}"
            )));
        }
    }

    let payload = envelope
        .get("payload")
        .cloned()
        .ok_or_else(|| SegError::invalid_input("config envelope is missing 'payload'"))?;
    let config: PipelineConfig = serde_json::from_value(payload)
        .map_err(|err| SegError::invalid_input(format!("invalid config payload: {err}")))?;
    config.validate()?;
    Ok(config)
}

/// One trajectory's model output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    /// Class id per position.
    Labels(Vec<usize>),
    /// Per-position class scores, one row per position.
    Scores(Vec<Vec<f64>>),
    /// Continuous per-position output, fitted piecewise before splitting.
    Signal(Vec<f64>),
}

impl Prediction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Labels(_) => "labels",
            Self::Scores(_) => "scores",
            Self::Signal(_) => "signal",
        }
    }
}

/// Result of post-processing one [`Prediction`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostprocessOutcome {
    Discrete {
        reduction: Reduction<usize>,
    },
    Continuous {
        fit: PiecewiseFit,
        reduction: Reduction<f64>,
    },
}

impl PostprocessOutcome {
    pub fn change_points(&self) -> &[usize] {
        match self {
            Self::Discrete { reduction } => reduction.change_points.as_slice(),
            Self::Continuous { reduction, .. } => reduction.change_points.as_slice(),
        }
    }
}

/// Flattens rectangular score rows into a row-major buffer.
pub fn flatten_scores(rows: &[Vec<f64>]) -> Result<(Vec<f64>, usize, usize), SegError> {
    let n = rows.len();
    let c = rows.first().map_or(0, Vec::len);
    let mut flat = Vec::with_capacity(n.saturating_mul(c));
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != c {
            return Err(SegError::invalid_input(format!(
                "score rows must share length; row 0 has {c}, row {idx} has {}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Ok((flat, n, c))
}

fn argmax_score_rows(rows: &[Vec<f64>]) -> Result<Vec<usize>, SegError> {
    let (flat, n, c) = flatten_scores(rows)?;
    argmax_rows(&flat, n, c)
}

/// Runs the full chain for trajectory `stream` of a batch.
///
/// Labels go straight to the merge engine, scores are argmaxed first, and
/// signals are fitted piecewise-constant before their levels are split.
pub fn postprocess_prediction(
    prediction: &Prediction,
    config: &PipelineConfig,
    stream: usize,
) -> Result<PostprocessOutcome, SegError> {
    match prediction {
        Prediction::Labels(labels) => Ok(PostprocessOutcome::Discrete {
            reduction: post_process_stream(labels, &config.postprocess, stream)?,
        }),
        Prediction::Scores(rows) => {
            let labels = argmax_score_rows(rows)
                .map_err(|err| err.with_context(format!("trajectory {stream}")))?;
            Ok(PostprocessOutcome::Discrete {
                reduction: post_process_stream(&labels, &config.postprocess, stream)?,
            })
        }
        Prediction::Signal(signal) => {
            let segmenter = KernelSegmenter::new(config.fit.clone())?;
            let fit = PiecewiseFit::fit(signal, &segmenter)
                .map_err(|err| err.with_context(format!("trajectory {stream}")))?;
            let reduction = post_process_stream(&fit.fitted, &config.postprocess, stream)?;
            Ok(PostprocessOutcome::Continuous { fit, reduction })
        }
    }
}

/// Post-processes a batch; trajectory `i` uses tie-break stream `i`.
///
/// Label-only batches go through [`reduce_batch`], which runs in parallel
/// when the `rayon` feature is enabled.
pub fn postprocess_batch(
    predictions: &[Prediction],
    config: &PipelineConfig,
) -> Result<Vec<PostprocessOutcome>, SegError> {
    config.validate()?;
    if let Some(trajectories) = label_trajectories(predictions) {
        let reductions = reduce_batch(&trajectories, &config.postprocess)?;
        return Ok(reductions
            .into_iter()
            .map(|reduction| PostprocessOutcome::Discrete { reduction })
            .collect());
    }

    predictions
        .iter()
        .enumerate()
        .map(|(stream, prediction)| postprocess_prediction(prediction, config, stream))
        .collect()
}

fn label_trajectories(predictions: &[Prediction]) -> Option<Vec<Vec<usize>>> {
    predictions
        .iter()
        .map(|prediction| match prediction {
            Prediction::Labels(labels) => Some(labels.clone()),
            Prediction::Scores(_) | Prediction::Signal(_) => None,
        })
        .collect()
}

/// One line of a segmentation challenge submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub dim: usize,
    pub change_point: usize,
    pub class_0: usize,
    pub value_0: f64,
    pub class_1: usize,
    pub value_1: f64,
}

impl ChallengeRecord {
    /// Record for a class prediction; both value fields are `0.0`.
    pub fn from_prediction(dim: usize, prediction: &TwoSegmentPrediction<usize>) -> Self {
        Self {
            dim,
            change_point: prediction.change_point,
            class_0: prediction.class_0,
            value_0: 0.0,
            class_1: prediction.class_1,
            value_1: 0.0,
        }
    }
}

impl fmt::Display for ChallengeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; {}; {}; {:?}; {}; {:?}",
            self.dim, self.change_point, self.class_0, self.value_0, self.class_1, self.value_1
        )
    }
}

/// One line of an anomalous-exponent submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlphaRecord {
    pub dim: usize,
    pub alpha: f64,
}

impl AlphaRecord {
    /// Averages a per-position regression output into a single exponent.
    pub fn from_signal(dim: usize, signal: &[f64]) -> Result<Self, SegError> {
        if signal.is_empty() {
            return Err(SegError::invalid_input(
                "alpha signal must be non-empty; got length 0",
            ));
        }
        let alpha = signal.iter().sum::<f64>() / signal.len() as f64;
        if !alpha.is_finite() {
            return Err(SegError::numerical_issue(format!(
                "alpha mean is not finite: {alpha}"
            )));
        }
        Ok(Self { dim, alpha })
    }
}

impl fmt::Display for AlphaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; {:?}", self.dim, self.alpha)
    }
}

/// Splits a regression output once and reports the mean on each side.
///
/// Uses an exact known-`k = 1` kernel fit with segments of at least
/// [`ALPHA_MIN_SEGMENT_LEN`] positions; both class fields are `0`.
pub fn alpha_segmentation_record(signal: &[f64], dim: usize) -> Result<ChallengeRecord, SegError> {
    let segmenter = KernelSegmenter::new(KernelFitConfig {
        stopping: Stopping::KnownK(1),
        min_segment_len: ALPHA_MIN_SEGMENT_LEN,
        ..KernelFitConfig::default()
    })?;
    let breakpoints = segmenter.segment(signal)?;
    let change_point = breakpoints
        .first()
        .copied()
        .ok_or_else(|| SegError::numerical_issue("known-k fit returned no breakpoints"))?;
    let (value_0, value_1) = segment_means(signal, change_point)?;
    Ok(ChallengeRecord {
        dim,
        change_point,
        class_0: 0,
        value_0,
        class_1: 0,
        value_1,
    })
}

/// Which submission file to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportTask {
    /// Change point plus one class per segment, from labels or scores.
    Models,
    /// Single exponent per trajectory, from a signal.
    Alpha,
    /// Change point plus one mean exponent per segment, from a signal.
    SegmentationAlpha,
}

impl ExportTask {
    pub fn parse(raw: &str) -> Result<Self, SegError> {
        match raw {
            "models" => Ok(Self::Models),
            "alpha" => Ok(Self::Alpha),
            "segmentation-alpha" => Ok(Self::SegmentationAlpha),
            other => Err(SegError::invalid_input(format!(
                "unknown export task '{other}'; expected one of: models, alpha, segmentation-alpha"
            ))),
        }
    }
}

/// Renders one submission line per prediction.
pub fn export_lines(
    predictions: &[Prediction],
    task: ExportTask,
    config: &PipelineConfig,
) -> Result<Vec<String>, SegError> {
    config.validate()?;
    let dim = config.export.dim;
    predictions
        .iter()
        .enumerate()
        .map(|(stream, prediction)| {
            let context = format!("trajectory {stream}");
            match (task, prediction) {
                (ExportTask::Models, Prediction::Labels(labels)) => {
                    models_line(labels, config, stream)
                }
                (ExportTask::Models, Prediction::Scores(rows)) => {
                    let labels =
                        argmax_score_rows(rows).map_err(|err| err.with_context(&context))?;
                    models_line(&labels, config, stream)
                }
                (ExportTask::Alpha, Prediction::Signal(signal)) => {
                    let record = AlphaRecord::from_signal(dim, signal)
                        .map_err(|err| err.with_context(&context))?;
                    Ok(record.to_string())
                }
                (ExportTask::SegmentationAlpha, Prediction::Signal(signal)) => {
                    let record = alpha_segmentation_record(signal, dim)
                        .map_err(|err| err.with_context(&context))?;
                    Ok(record.to_string())
                }
                (task, prediction) => Err(SegError::invalid_input(format!(
                    "{context}: export task {task:?} does not accept '{}' predictions",
                    prediction.kind()
                ))),
            }
        })
        .collect()
}

fn models_line(labels: &[usize], config: &PipelineConfig, stream: usize) -> Result<String, SegError> {
    let reduction = post_process_stream(labels, &config.postprocess, stream)?;
    let prediction =
        TwoSegmentPrediction::from_reduction(&reduction, config.export.missing_change_point)
            .map_err(|err| err.with_context(format!("trajectory {stream}")))?;
    Ok(ChallengeRecord::from_prediction(config.export.dim, &prediction).to_string())
}

/// Joins rendered lines into a submission file body.
pub fn render_submission(lines: &[String]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

/// Scores of a batch of change-point predictions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub threshold: usize,
    pub trajectories: Vec<ChangePointEvaluation>,
    pub tally: EvaluationTally,
    /// `None` when no trajectory has a true or predicted change point.
    pub jaccard: Option<f64>,
    /// `None` when there is no true positive.
    pub rmse: Option<f64>,
}

pub fn evaluate_batch(
    truth: &[Vec<usize>],
    predicted: &[Vec<usize>],
    threshold: usize,
) -> Result<EvalReport, SegError> {
    if truth.len() != predicted.len() {
        return Err(SegError::invalid_input(format!(
            "ground truth and predictions must hold the same number of trajectories; got true={}, predicted={}",
            truth.len(),
            predicted.len()
        )));
    }

    let mut tally = EvaluationTally::default();
    let mut trajectories = Vec::with_capacity(truth.len());
    for (true_cps, pred_cps) in truth.iter().zip(predicted) {
        let evaluation = evaluate_change_points(true_cps, pred_cps, threshold)?;
        tally.add(&evaluation)?;
        trajectories.push(evaluation);
    }

    Ok(EvalReport {
        threshold,
        jaccard: tally.jaccard().ok(),
        rmse: tally.rmse(),
        trajectories,
        tally,
    })
}

/// CLI namespace helper.
pub fn crate_name() -> &'static str {
    "trajseg-cli"
}
