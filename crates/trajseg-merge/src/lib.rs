// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod batch;
pub mod engine;
pub mod postprocess;
pub mod split;
pub mod vote;

pub use batch::{post_process_stream, reduce_batch};
pub use engine::{MergeDirection, MergeEngine, Reduction, can_merge, reduce};
pub use postprocess::{
    PostProcessConfig, TwoSegmentPrediction, post_process, post_process_scores,
    post_process_with_config,
};
pub use split::{Split, SplitList, find_change_points, split};
pub use vote::{
    abundance, majority_candidates, majority_vote, majority_vote_with_tie, ranked_values,
    value_counts,
};

/// Returns the crate name for smoke-testing integration wiring.
pub fn crate_name() -> &'static str {
    "trajseg-merge"
}
