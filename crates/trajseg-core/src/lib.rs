// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for trajectory segmentation post-processing.

pub mod diagnostics;
pub mod error;
pub mod labels;
pub mod tie_break;

pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics, MergeStats};
pub use error::{SegError, checked_counter_increment};
pub use labels::{Label, argmax_rows, validate_labels};
pub use tie_break::{ScriptedTieBreaker, StableRng, TieBreaker};

/// Core crate name helper.
pub fn crate_name() -> &'static str {
    "trajseg-core"
}
