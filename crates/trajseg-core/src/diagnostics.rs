// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;

/// Diagnostics schema version for post-processing run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Counters describing which merge rules fired during a reduction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub iterations: usize,
    pub interior_merges: usize,
    pub contiguous_merges: usize,
    pub edge_merges: usize,
    pub random_tie_breaks: usize,
}

impl MergeStats {
    /// Sum of all merge counters, saturating at `usize::MAX`.
    pub fn total_merges(&self) -> usize {
        self.interior_merges
            .saturating_add(self.contiguous_merges)
            .saturating_add(self.edge_merges)
    }
}

/// Structured diagnostics captured from a post-processing run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub n: usize,
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub algorithm: Cow<'static, str>,
    pub seed: Option<u64>,
    pub initial_segments: usize,
    pub final_segments: usize,
    pub merge_stats: Option<MergeStats>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            n: 0,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
            algorithm: Cow::Borrowed(""),
            seed: None,
            initial_segments: 0,
            final_segments: 0,
            merge_stats: None,
        }
    }
}
