// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::engine::Reduction;
use crate::postprocess::{PostProcessConfig, post_process};
use trajseg_core::{Label, SegError, StableRng};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Reduces every trajectory independently.
///
/// Trajectory `i` draws its tie-breaks from `StableRng::for_stream(seed, i)`,
/// so results do not depend on scheduling. With the `rayon` feature the
/// trajectories are processed in parallel; the output order always matches
/// the input order.
pub fn reduce_batch<L>(
    trajectories: &[Vec<L>],
    config: &PostProcessConfig,
) -> Result<Vec<Reduction<L>>, SegError>
where
    L: Label + Send + Sync,
{
    config.validate()?;

    #[cfg(feature = "rayon")]
    {
        trajectories
            .par_iter()
            .enumerate()
            .map(|(idx, labels)| post_process_stream(labels, config, idx))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        trajectories
            .iter()
            .enumerate()
            .map(|(idx, labels)| post_process_stream(labels, config, idx))
            .collect()
    }
}

/// Post-processes one trajectory of a batch with its own tie-break stream.
///
/// Equivalent to the `idx`-th entry of [`reduce_batch`].
pub fn post_process_stream<L: Label>(
    labels: &[L],
    config: &PostProcessConfig,
    idx: usize,
) -> Result<Reduction<L>, SegError> {
    let mut rng = StableRng::for_stream(config.seed, idx);
    let mut reduction = post_process(labels, config.n_change_points, &mut rng)
        .map_err(|err| err.with_context(format!("trajectory {idx}")))?;
    reduction.diagnostics.seed = Some(config.seed);
    reduction
        .diagnostics
        .notes
        .push(format!("trajectory_index={idx}"));
    Ok(reduction)
}

#[cfg(test)]
mod tests {
    use super::reduce_batch;
    use crate::postprocess::{PostProcessConfig, post_process};
    use trajseg_core::StableRng;

    fn trajectories() -> Vec<Vec<u8>> {
        vec![
            vec![0, 0, 0, 1, 1, 1],
            vec![0, 1, 0, 1, 0, 1, 0, 1],
            vec![2, 2, 1, 1, 1, 0, 0, 2, 2, 1],
            vec![4],
        ]
    }

    #[test]
    fn batch_matches_per_trajectory_streams() {
        let config = PostProcessConfig {
            n_change_points: 1,
            seed: 5,
        };
        let batch = reduce_batch(&trajectories(), &config).expect("batch should succeed");
        assert_eq!(batch.len(), 4);

        for (idx, labels) in trajectories().iter().enumerate() {
            let mut rng = StableRng::for_stream(5, idx);
            let single = post_process(labels, 1, &mut rng).expect("single run should succeed");
            assert_eq!(batch[idx].change_points, single.change_points);
            assert_eq!(batch[idx].classes, single.classes);
            assert_eq!(batch[idx].diagnostics.seed, Some(5));
        }
        assert!(batch[3].change_points.is_empty());
    }

    #[test]
    fn batch_reports_the_failing_trajectory() {
        let mut input = trajectories();
        input.push(vec![]);
        let err = reduce_batch(&input, &PostProcessConfig::default())
            .expect_err("empty trajectory must fail");
        assert!(err.to_string().contains("trajectory 4"));
    }

    #[test]
    fn empty_batch_is_empty() {
        let input: Vec<Vec<u8>> = vec![];
        let batch =
            reduce_batch(&input, &PostProcessConfig::default()).expect("empty batch is fine");
        assert!(batch.is_empty());
    }
}
