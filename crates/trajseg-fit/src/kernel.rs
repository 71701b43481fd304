// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::Segmenter;
use std::borrow::Cow;
use std::time::Instant;
use trajseg_core::{Diagnostics, SegError};

const DEFAULT_PENALTY: f64 = 1.0;
const DEFAULT_MIN_SEGMENT_LEN: usize = 2;
const LARGE_GRAM_WARNING_BYTES: usize = 256 * 1024 * 1024;

/// Kernel choices for [`KernelSegmenter`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub enum KernelSpec {
    /// Linear dot-product kernel; the segment cost is the within-segment
    /// sum of squared deviations from the mean.
    #[default]
    Linear,
    /// Radial basis function kernel.
    ///
    /// If `gamma` is `None`, a data-driven heuristic is resolved at runtime.
    Rbf { gamma: Option<f64> },
}

/// How many breakpoints the fit keeps.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum Stopping {
    /// Optimal partition under a fixed cost per change point.
    Penalized(f64),
    /// Exactly `k` change points.
    KnownK(usize),
}

impl Default for Stopping {
    fn default() -> Self {
        Self::Penalized(DEFAULT_PENALTY)
    }
}

/// Configuration for [`KernelSegmenter`].
///
/// The fit precomputes an `n x n` Gram matrix, so memory grows as `O(n^2)`.
/// Trajectories are short enough for that to be cheap.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Clone, Debug, PartialEq)]
pub struct KernelFitConfig {
    pub kernel: KernelSpec,
    pub stopping: Stopping,
    pub min_segment_len: usize,
}

impl Default for KernelFitConfig {
    fn default() -> Self {
        Self {
            kernel: KernelSpec::default(),
            stopping: Stopping::default(),
            min_segment_len: DEFAULT_MIN_SEGMENT_LEN,
        }
    }
}

impl KernelFitConfig {
    pub fn validate(&self) -> Result<(), SegError> {
        if self.min_segment_len == 0 {
            return Err(SegError::invalid_input(
                "KernelFitConfig.min_segment_len must be >= 1; got 0",
            ));
        }
        match self.stopping {
            Stopping::Penalized(penalty) if !penalty.is_finite() || penalty <= 0.0 => {
                return Err(SegError::invalid_input(format!(
                    "Stopping::Penalized requires a finite penalty > 0; got {penalty}"
                )));
            }
            Stopping::KnownK(0) => {
                return Err(SegError::invalid_input("Stopping::KnownK requires k >= 1"));
            }
            _ => {}
        }
        if let KernelSpec::Rbf { gamma: Some(gamma) } = self.kernel
            && (!gamma.is_finite() || gamma <= 0.0)
        {
            return Err(SegError::invalid_input(format!(
                "KernelSpec::Rbf gamma must be finite and > 0; got {gamma}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum ResolvedKernel {
    Rbf { gamma: f64 },
    Linear,
}

impl ResolvedKernel {
    fn label(&self) -> &'static str {
        match self {
            Self::Rbf { .. } => "rbf",
            Self::Linear => "linear",
        }
    }

    fn value(&self, left: f64, right: f64) -> f64 {
        match self {
            Self::Linear => left * right,
            Self::Rbf { gamma } => {
                let delta = left - right;
                (-gamma * delta * delta).exp()
            }
        }
    }
}

/// Exact kernel change-point fit over a 1-D signal.
///
/// The objective is a kernelized within-segment dispersion. Breakpoints are
/// selected by dynamic programming under the configured stopping policy.
#[derive(Clone, Debug)]
pub struct KernelSegmenter {
    config: KernelFitConfig,
}

/// Breakpoints chosen by a [`KernelSegmenter`] run.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelFit {
    pub breakpoints: Vec<usize>,
    pub objective: f64,
    pub diagnostics: Diagnostics,
}

impl KernelFit {
    /// Breakpoints without the trailing `n`.
    pub fn change_points(&self) -> &[usize] {
        &self.breakpoints[..self.breakpoints.len().saturating_sub(1)]
    }
}

#[derive(Default, Clone, Copy, Debug)]
struct RuntimeStats {
    gram_evals: usize,
    segment_cost_evals: usize,
    candidate_evals: usize,
}

#[derive(Clone, Debug)]
struct SegmentationResult {
    breakpoints: Vec<usize>,
    objective: f64,
}

impl KernelSegmenter {
    pub fn new(config: KernelFitConfig) -> Result<Self, SegError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KernelFitConfig {
        &self.config
    }

    pub fn fit(&self, signal: &[f64]) -> Result<KernelFit, SegError> {
        validate_signal(signal)?;
        let n = signal.len();
        let started_at = Instant::now();
        let mut runtime = RuntimeStats::default();
        let mut notes = vec!["complexity=time:O(n^2),memory:O(n^2)".to_string()];
        let mut warnings = vec![];

        let gram_bytes = n
            .checked_mul(n)
            .and_then(|cells| cells.checked_mul(std::mem::size_of::<f64>()))
            .ok_or_else(|| SegError::resource_limit("Gram matrix size overflow"))?;
        notes.push(format!("gram_matrix_bytes={gram_bytes}"));
        if gram_bytes >= LARGE_GRAM_WARNING_BYTES {
            warnings.push(format!(
                "kernel fit allocated a large Gram matrix ({} MiB)",
                gram_bytes / (1024 * 1024)
            ));
        }

        let (kernel, mut kernel_notes) = resolve_kernel(&self.config.kernel, signal);
        notes.append(&mut kernel_notes);
        notes.push(format!("kernel={}", kernel.label()));

        let gram = compute_gram(signal, kernel, &mut runtime)?;
        let cache = GramCache::new(gram.as_slice(), n);

        let selection = match self.config.stopping {
            Stopping::KnownK(k) => {
                notes.push(format!("stopping=KnownK({k})"));
                run_known_k(k, &cache, self.config.min_segment_len, &mut runtime)?
            }
            Stopping::Penalized(penalty) => {
                notes.push(format!("stopping=Penalized({penalty})"));
                run_penalized(penalty, &cache, self.config.min_segment_len, &mut runtime)?
            }
        };

        let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        let change_count = selection.breakpoints.len().saturating_sub(1);
        notes.push(format!(
            "final_objective={}, change_count={change_count}",
            selection.objective
        ));
        notes.push(format!(
            "gram_evals={}, segment_cost_evals={}, candidate_evals={}",
            runtime.gram_evals, runtime.segment_cost_evals, runtime.candidate_evals
        ));

        let diagnostics = Diagnostics {
            n,
            runtime_ms: Some(runtime_ms),
            notes,
            warnings,
            algorithm: Cow::Borrowed(match kernel {
                ResolvedKernel::Rbf { .. } => "kernel_fit_rbf",
                ResolvedKernel::Linear => "kernel_fit_linear",
            }),
            initial_segments: n,
            final_segments: selection.breakpoints.len(),
            ..Diagnostics::default()
        };

        Ok(KernelFit {
            breakpoints: selection.breakpoints,
            objective: selection.objective,
            diagnostics,
        })
    }
}

impl Segmenter for KernelSegmenter {
    fn segment(&self, signal: &[f64]) -> Result<Vec<usize>, SegError> {
        Ok(self.fit(signal)?.breakpoints)
    }
}

fn validate_signal(signal: &[f64]) -> Result<(), SegError> {
    if signal.is_empty() {
        return Err(SegError::invalid_input(
            "signal must be non-empty; got length 0",
        ));
    }
    if let Some((idx, value)) = signal
        .iter()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(SegError::invalid_input(format!(
            "signal must be finite; index {idx} has {value}"
        )));
    }
    Ok(())
}

fn resolve_kernel(spec: &KernelSpec, signal: &[f64]) -> (ResolvedKernel, Vec<String>) {
    let mut notes = vec![];
    match spec {
        KernelSpec::Linear => (ResolvedKernel::Linear, notes),
        KernelSpec::Rbf { gamma: Some(gamma) } => (ResolvedKernel::Rbf { gamma: *gamma }, notes),
        KernelSpec::Rbf { gamma: None } => {
            let mut sum_sq = 0.0;
            let mut count = 0usize;
            for left in 0..signal.len() {
                for right in left + 1..signal.len() {
                    let delta = signal[left] - signal[right];
                    let dist_sq = delta * delta;
                    if dist_sq.is_finite() && dist_sq > 0.0 {
                        sum_sq += dist_sq;
                        count = count.saturating_add(1);
                    }
                }
            }

            let gamma = if count > 0 && sum_sq > 0.0 {
                1.0 / (2.0 * (sum_sq / count as f64))
            } else {
                0.5
            };
            notes.push(format!("kernel.rbf.gamma_auto={gamma}"));
            (ResolvedKernel::Rbf { gamma }, notes)
        }
    }
}

fn compute_gram(
    signal: &[f64],
    kernel: ResolvedKernel,
    runtime: &mut RuntimeStats,
) -> Result<Vec<f64>, SegError> {
    let n = signal.len();
    let mut gram = vec![0.0; n * n];
    for left in 0..n {
        for right in left..n {
            runtime.gram_evals = runtime.gram_evals.saturating_add(1);
            let value = kernel.value(signal[left], signal[right]);
            if !value.is_finite() {
                return Err(SegError::numerical_issue(format!(
                    "non-finite kernel value at ({left}, {right})"
                )));
            }
            gram[left * n + right] = value;
            gram[right * n + left] = value;
        }
    }
    Ok(gram)
}

/// 2-D prefix sums of the Gram matrix plus prefix sums of its diagonal.
struct GramCache {
    n: usize,
    prefix: Vec<f64>,
    diag_prefix: Vec<f64>,
}

impl GramCache {
    fn new(gram: &[f64], n: usize) -> Self {
        let mut prefix = vec![0.0; (n + 1) * (n + 1)];
        for row in 0..n {
            for col in 0..n {
                let idx = (row + 1) * (n + 1) + (col + 1);
                prefix[idx] = gram[row * n + col]
                    + prefix[row * (n + 1) + (col + 1)]
                    + prefix[(row + 1) * (n + 1) + col]
                    - prefix[row * (n + 1) + col];
            }
        }

        let mut diag_prefix = vec![0.0; n + 1];
        for i in 0..n {
            diag_prefix[i + 1] = diag_prefix[i] + gram[i * n + i];
        }

        Self {
            n,
            prefix,
            diag_prefix,
        }
    }

    fn block_sum(&self, start: usize, end: usize) -> f64 {
        let stride = self.n + 1;
        self.prefix[end * stride + end]
            - self.prefix[start * stride + end]
            - self.prefix[end * stride + start]
            + self.prefix[start * stride + start]
    }

    fn segment_cost(
        &self,
        start: usize,
        end: usize,
        runtime: &mut RuntimeStats,
    ) -> Result<f64, SegError> {
        if end <= start {
            return Err(SegError::invalid_input(format!(
                "invalid segment bounds: start={start}, end={end}"
            )));
        }
        runtime.segment_cost_evals = runtime.segment_cost_evals.saturating_add(1);

        let len = (end - start) as f64;
        let diag_sum = self.diag_prefix[end] - self.diag_prefix[start];
        let mut cost = diag_sum - self.block_sum(start, end) / len;
        if cost < 0.0 && cost > -1.0e-9 {
            cost = 0.0;
        }
        if !cost.is_finite() {
            return Err(SegError::numerical_issue(format!(
                "non-finite segment cost at [{start}, {end})"
            )));
        }
        Ok(cost)
    }
}

fn run_known_k(
    k: usize,
    cache: &GramCache,
    min_segment_len: usize,
    runtime: &mut RuntimeStats,
) -> Result<SegmentationResult, SegError> {
    let n = cache.n;
    let segments = k
        .checked_add(1)
        .ok_or_else(|| SegError::invalid_input(format!("KnownK({k}) overflows")))?;
    let inf = f64::INFINITY;
    let mut dp = vec![vec![inf; n + 1]; segments + 1];
    let mut back = vec![vec![None; n + 1]; segments + 1];
    dp[0][0] = 0.0;

    for seg_count in 1..=segments {
        for end in 1..=n {
            for prev in 0..end {
                if !dp[seg_count - 1][prev].is_finite() || end - prev < min_segment_len {
                    continue;
                }
                runtime.candidate_evals = runtime.candidate_evals.saturating_add(1);
                let candidate = dp[seg_count - 1][prev] + cache.segment_cost(prev, end, runtime)?;
                if candidate < dp[seg_count][end] {
                    dp[seg_count][end] = candidate;
                    back[seg_count][end] = Some(prev);
                }
            }
        }
    }

    let objective = dp[segments][n];
    if !objective.is_finite() {
        return Err(SegError::invalid_input(format!(
            "KnownK({k}) is infeasible for n={n} with min_segment_len={min_segment_len}"
        )));
    }

    let mut breakpoints = Vec::with_capacity(segments);
    let mut idx = n;
    let mut seg_count = segments;
    while seg_count > 0 {
        breakpoints.push(idx);
        idx = back[seg_count][idx].ok_or_else(|| {
            SegError::resource_limit("internal backtrace failure in KnownK kernel fit")
        })?;
        seg_count -= 1;
    }
    breakpoints.reverse();

    Ok(SegmentationResult {
        breakpoints,
        objective,
    })
}

fn run_penalized(
    penalty: f64,
    cache: &GramCache,
    min_segment_len: usize,
    runtime: &mut RuntimeStats,
) -> Result<SegmentationResult, SegError> {
    let n = cache.n;
    let inf = f64::INFINITY;
    let mut best = vec![inf; n + 1];
    let mut back = vec![None; n + 1];
    let mut change_counts = vec![usize::MAX; n + 1];
    best[0] = 0.0;
    change_counts[0] = 0;

    for end in 1..=n {
        for prev in 0..end {
            if !best[prev].is_finite() || end - prev < min_segment_len {
                continue;
            }
            runtime.candidate_evals = runtime.candidate_evals.saturating_add(1);
            let next_changes = change_counts[prev].saturating_add(usize::from(prev > 0));
            let step_penalty = if prev > 0 { penalty } else { 0.0 };
            let candidate = best[prev] + cache.segment_cost(prev, end, runtime)? + step_penalty;

            let improve = candidate < best[end]
                || (candidate == best[end] && next_changes < change_counts[end]);
            if improve {
                best[end] = candidate;
                back[end] = Some(prev);
                change_counts[end] = next_changes;
            }
        }
    }

    let objective = best[n];
    if !objective.is_finite() {
        return Err(SegError::invalid_input(format!(
            "penalized kernel fit is infeasible for n={n} with min_segment_len={min_segment_len}"
        )));
    }

    let mut breakpoints = Vec::new();
    let mut idx = n;
    while idx > 0 {
        breakpoints.push(idx);
        idx = back[idx].ok_or_else(|| {
            SegError::resource_limit("internal backtrace failure in penalized kernel fit")
        })?;
    }
    breakpoints.reverse();

    Ok(SegmentationResult {
        breakpoints,
        objective,
    })
}

#[cfg(test)]
mod tests {
    use super::{KernelFitConfig, KernelSegmenter, KernelSpec, Stopping};
    use crate::Segmenter;
    use trajseg_core::SegError;

    fn step_signal(left: f64, right: f64, split: usize, n: usize) -> Vec<f64> {
        (0..n)
            .map(|idx| if idx < split { left } else { right })
            .collect()
    }

    #[test]
    fn config_defaults_match_expectations() {
        let cfg = KernelFitConfig::default();
        assert_eq!(cfg.kernel, KernelSpec::Linear);
        assert_eq!(cfg.stopping, Stopping::Penalized(1.0));
        assert_eq!(cfg.min_segment_len, 2);
        cfg.validate().expect("default config should validate");
    }

    #[test]
    fn config_validation_rejects_bad_parameters() {
        let bad = [
            KernelFitConfig {
                min_segment_len: 0,
                ..KernelFitConfig::default()
            },
            KernelFitConfig {
                stopping: Stopping::Penalized(0.0),
                ..KernelFitConfig::default()
            },
            KernelFitConfig {
                stopping: Stopping::Penalized(f64::NAN),
                ..KernelFitConfig::default()
            },
            KernelFitConfig {
                stopping: Stopping::KnownK(0),
                ..KernelFitConfig::default()
            },
            KernelFitConfig {
                kernel: KernelSpec::Rbf { gamma: Some(-1.0) },
                ..KernelFitConfig::default()
            },
        ];
        for config in bad {
            let err = KernelSegmenter::new(config.clone())
                .expect_err("invalid config should be rejected");
            assert!(
                matches!(err, SegError::InvalidInput(_)),
                "unexpected error for {config:?}: {err}"
            );
        }
    }

    #[test]
    fn penalized_linear_fit_finds_a_clean_step() {
        let signal = step_signal(0.0, 5.0, 10, 20);
        let segmenter =
            KernelSegmenter::new(KernelFitConfig::default()).expect("default config should build");
        let fit = segmenter.fit(&signal).expect("fit should succeed");
        assert_eq!(fit.breakpoints, vec![10, 20]);
        assert_eq!(fit.change_points(), &[10]);
        assert!(fit.objective > 0.0);
        assert_eq!(fit.diagnostics.algorithm, "kernel_fit_linear");
    }

    #[test]
    fn constant_signal_has_no_change_points() {
        let signal = vec![0.7; 32];
        let segmenter =
            KernelSegmenter::new(KernelFitConfig::default()).expect("default config should build");
        assert_eq!(
            segmenter.segment(&signal).expect("fit should succeed"),
            vec![32]
        );
    }

    #[test]
    fn known_k_places_the_requested_number_of_breakpoints() {
        let mut signal = step_signal(1.0, 3.0, 12, 24);
        signal.extend(std::iter::repeat_n(-2.0, 12));
        let segmenter = KernelSegmenter::new(KernelFitConfig {
            stopping: Stopping::KnownK(2),
            ..KernelFitConfig::default()
        })
        .expect("known-k config should build");
        assert_eq!(
            segmenter.segment(&signal).expect("fit should succeed"),
            vec![12, 24, 36]
        );
    }

    #[test]
    fn known_k_respects_min_segment_len() {
        let signal = step_signal(0.0, 4.0, 2, 12);
        let segmenter = KernelSegmenter::new(KernelFitConfig {
            stopping: Stopping::KnownK(1),
            min_segment_len: 5,
            ..KernelFitConfig::default()
        })
        .expect("known-k config should build");
        let breakpoints = segmenter.segment(&signal).expect("fit should succeed");
        assert_eq!(breakpoints.len(), 2);
        assert_eq!(breakpoints[0], 5);
    }

    #[test]
    fn infeasible_known_k_is_reported() {
        let signal = vec![0.0; 6];
        let segmenter = KernelSegmenter::new(KernelFitConfig {
            stopping: Stopping::KnownK(3),
            min_segment_len: 2,
            ..KernelFitConfig::default()
        })
        .expect("known-k config should build");
        let err = segmenter.fit(&signal).expect_err("3 change points cannot fit");
        assert!(err.to_string().contains("infeasible"));
    }

    #[test]
    fn rbf_kernel_detects_distributional_change() {
        let n = 180usize;
        let split = 90usize;
        let mut values = Vec::with_capacity(n);
        for idx in 0..split {
            values.push(if idx % 2 == 0 { -1.0 } else { 1.0 });
        }
        let pattern = [-2.0, -0.2, 0.2, 2.0];
        for idx in split..n {
            values.push(pattern[idx % pattern.len()]);
        }

        let fit = KernelSegmenter::new(KernelFitConfig {
            kernel: KernelSpec::Rbf { gamma: None },
            stopping: Stopping::KnownK(1),
            min_segment_len: 8,
        })
        .expect("rbf config should build")
        .fit(&values)
        .expect("rbf fit should succeed");

        assert_eq!(fit.breakpoints.len(), 2);
        let cp = fit.breakpoints[0];
        assert!(
            cp.abs_diff(split) <= 12,
            "expected split near {split}, got {cp}"
        );
        assert!(
            fit.diagnostics
                .notes
                .iter()
                .any(|note| note.starts_with("kernel.rbf.gamma_auto="))
        );
    }

    #[test]
    fn empty_and_non_finite_signals_are_rejected() {
        let segmenter =
            KernelSegmenter::new(KernelFitConfig::default()).expect("default config should build");
        let err = segmenter.fit(&[]).expect_err("empty signal must fail");
        assert!(matches!(err, SegError::InvalidInput(_)));

        let err = segmenter
            .fit(&[0.0, f64::INFINITY, 1.0])
            .expect_err("infinite value must fail");
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn signal_shorter_than_min_segment_is_infeasible() {
        let segmenter =
            KernelSegmenter::new(KernelFitConfig::default()).expect("default config should build");
        let err = segmenter.fit(&[1.0]).expect_err("one sample cannot form a segment of 2");
        assert!(err.to_string().contains("infeasible"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_json_fills_defaults_and_round_trips() {
        let cfg: KernelFitConfig =
            serde_json::from_str(r#"{"stopping": {"KnownK": 1}, "min_segment_len": 5}"#)
                .expect("partial config should parse");
        assert_eq!(cfg.kernel, KernelSpec::Linear);
        assert_eq!(cfg.stopping, Stopping::KnownK(1));
        assert_eq!(cfg.min_segment_len, 5);

        let rbf = KernelFitConfig {
            kernel: KernelSpec::Rbf { gamma: Some(0.25) },
            ..KernelFitConfig::default()
        };
        let encoded = serde_json::to_string(&rbf).expect("config should serialize");
        let decoded: KernelFitConfig =
            serde_json::from_str(&encoded).expect("encoded config should parse");
        assert_eq!(decoded, rbf);

        let err = serde_json::from_str::<KernelFitConfig>(r#"{"penalty": 2.0}"#)
            .expect_err("unknown fields must be rejected");
        assert!(err.to_string().contains("unknown field"));
    }
}
