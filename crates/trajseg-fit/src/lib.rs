// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Piecewise-constant fits of continuous per-timestep predictions.

pub mod kernel;
pub mod piecewise;

pub use kernel::{KernelFit, KernelFitConfig, KernelSegmenter, KernelSpec, Stopping};
pub use piecewise::{
    PiecewiseFit, fit_segments, lengths_from_change_points, segment_means, split_at_indices,
};

use trajseg_core::SegError;

/// Produces breakpoints for a 1-D signal.
///
/// Breakpoints are strictly increasing segment end indices; the last one is
/// always `signal.len()`.
pub trait Segmenter {
    fn segment(&self, signal: &[f64]) -> Result<Vec<usize>, SegError>;
}

/// Returns the crate name for smoke-testing integration wiring.
pub fn crate_name() -> &'static str {
    "trajseg-fit"
}
