// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::split::{Split, SplitList};
use crate::vote::{abundance, majority_vote_with_tie, ranked_values, value_counts};
use std::borrow::Cow;
use std::time::Instant;
use trajseg_core::{
    Diagnostics, Label, MergeStats, SegError, TieBreaker, checked_counter_increment,
};

/// Side a split is merged towards.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeDirection {
    Left,
    Right,
}

/// Output of a reduction: boundaries, per-segment classes and final ranges.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Reduction<L> {
    pub change_points: Vec<usize>,
    pub classes: Vec<L>,
    pub splits: Vec<Split>,
    pub diagnostics: Diagnostics,
}

impl<L: Label> Reduction<L> {
    /// Re-attaches the final ranges to their label sequence.
    pub fn split_list<'a>(&self, labels: &'a [L]) -> Result<SplitList<'a, L>, SegError> {
        SplitList::from_splits(labels, self.splits.clone())
    }

    pub fn segment_lengths(&self) -> Vec<usize> {
        self.splits.iter().map(Split::len).collect()
    }
}

/// Greedy merge engine reducing a split list to `n_change_points + 1` splits.
///
/// Each iteration recomputes majority classes from the current list and
/// applies exactly one merge:
///
/// 1. the smallest interior split whose neighbours share a class, merged
///    towards the side where its own classes are more abundant;
/// 2. otherwise the right-most pair of adjacent splits sharing a class;
/// 3. otherwise one of the two edge splits, whichever resembles its neighbour
///    more.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeEngine {
    n_change_points: usize,
}

impl MergeEngine {
    pub fn new(n_change_points: usize) -> Self {
        Self { n_change_points }
    }

    pub fn n_change_points(&self) -> usize {
        self.n_change_points
    }

    pub fn target_segments(&self) -> Result<usize, SegError> {
        self.n_change_points.checked_add(1).ok_or_else(|| {
            SegError::invalid_input(format!(
                "n_change_points={} overflows the segment count",
                self.n_change_points
            ))
        })
    }

    /// Merges adjacent splits until exactly `n_change_points + 1` remain.
    ///
    /// When the list already holds that many splits or fewer, it is returned
    /// unchanged.
    pub fn reduce<L, R>(
        &self,
        mut splits: SplitList<'_, L>,
        rng: &mut R,
    ) -> Result<Reduction<L>, SegError>
    where
        L: Label,
        R: TieBreaker + ?Sized,
    {
        let started_at = Instant::now();
        let target = self.target_segments()?;
        let initial_segments = splits.len();
        let mut stats = MergeStats::default();
        let mut notes = vec![];
        let mut warnings = vec![];

        if initial_segments < target {
            warnings.push(format!(
                "requested {target} segments but the sequence has only {initial_segments} native splits; returning them unchanged"
            ));
        }

        while splits.len() > target {
            checked_counter_increment(&mut stats.iterations, "iterations")?;
            let classes = split_classes(&splits, rng, &mut stats)?;

            if let Some(idx) = first_mergeable_interior(&splits, classes.as_slice()) {
                let (direction, randomized) = interior_merge_direction(&splits, idx, rng)?;
                if randomized {
                    checked_counter_increment(&mut stats.random_tie_breaks, "random_tie_breaks")?;
                }
                match direction {
                    MergeDirection::Left => splits.merge_left(idx)?,
                    MergeDirection::Right => splits.merge_right(idx)?,
                }
                checked_counter_increment(&mut stats.interior_merges, "interior_merges")?;
                continue;
            }

            if let Some(idx) = last_same_class_pair(classes.as_slice()) {
                splits.merge_left(idx)?;
                checked_counter_increment(&mut stats.contiguous_merges, "contiguous_merges")?;
                continue;
            }

            let (edge, randomized) = edge_to_merge(&splits, rng)?;
            if randomized {
                checked_counter_increment(&mut stats.random_tie_breaks, "random_tie_breaks")?;
            }
            match edge {
                MergeDirection::Left => splits.merge_right(0)?,
                MergeDirection::Right => splits.merge_left(splits.len() - 1)?,
            }
            checked_counter_increment(&mut stats.edge_merges, "edge_merges")?;
        }

        let classes = split_classes(&splits, rng, &mut stats)?;
        let change_points = splits.change_points();
        let final_segments = splits.len();

        notes.push(format!(
            "target_segments={target}, initial_segments={initial_segments}, final_segments={final_segments}, merges_applied={}",
            stats.total_merges()
        ));
        notes.push(format!(
            "interior_merges={}, contiguous_merges={}, edge_merges={}, random_tie_breaks={}",
            stats.interior_merges,
            stats.contiguous_merges,
            stats.edge_merges,
            stats.random_tie_breaks
        ));

        let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        let diagnostics = Diagnostics {
            n: splits.labels().len(),
            runtime_ms: Some(runtime_ms),
            notes,
            warnings,
            algorithm: Cow::Borrowed("greedy_merge"),
            initial_segments,
            final_segments,
            merge_stats: Some(stats),
            ..Diagnostics::default()
        };

        Ok(Reduction {
            change_points,
            classes,
            splits: splits.into_splits(),
            diagnostics,
        })
    }
}

/// Reduces `splits` to `n_change_points` change points.
pub fn reduce<L, R>(
    splits: SplitList<'_, L>,
    n_change_points: usize,
    rng: &mut R,
) -> Result<Reduction<L>, SegError>
where
    L: Label,
    R: TieBreaker + ?Sized,
{
    MergeEngine::new(n_change_points).reduce(splits, rng)
}

/// Whether split `idx` may be merged: it is an edge, or both neighbours
/// share a majority class.
pub fn can_merge<L: Label>(classes: &[L], idx: usize) -> bool {
    idx == 0 || idx + 1 >= classes.len() || classes[idx - 1] == classes[idx + 1]
}

/// Majority class of every split, drawing from `rng` on ties.
fn split_classes<L, R>(
    splits: &SplitList<'_, L>,
    rng: &mut R,
    stats: &mut MergeStats,
) -> Result<Vec<L>, SegError>
where
    L: Label,
    R: TieBreaker + ?Sized,
{
    let mut classes = Vec::with_capacity(splits.len());
    for idx in 0..splits.len() {
        let (class, tied) = majority_vote_with_tie(splits.split_values(idx), rng)?;
        if tied {
            checked_counter_increment(&mut stats.random_tie_breaks, "random_tie_breaks")?;
        }
        classes.push(class);
    }
    Ok(classes)
}

/// Interior indices ordered by ascending split length, ties by position.
fn interior_merge_order<L: Label>(splits: &SplitList<'_, L>) -> Vec<usize> {
    let mut order: Vec<usize> = (1..splits.len().saturating_sub(1)).collect();
    order.sort_by_key(|&idx| splits.split_len(idx));
    order
}

fn first_mergeable_interior<L: Label>(splits: &SplitList<'_, L>, classes: &[L]) -> Option<usize> {
    interior_merge_order(splits)
        .into_iter()
        .find(|&idx| can_merge(classes, idx))
}

/// Right-most index `j` such that splits `j - 1` and `j` share a class.
fn last_same_class_pair<L: Label>(classes: &[L]) -> Option<usize> {
    (1..classes.len())
        .rev()
        .find(|&idx| classes[idx - 1] == classes[idx])
}

/// Direction for interior split `idx`; the flag reports a random draw.
fn interior_merge_direction<L, R>(
    splits: &SplitList<'_, L>,
    idx: usize,
    rng: &mut R,
) -> Result<(MergeDirection, bool), SegError>
where
    L: Label,
    R: TieBreaker + ?Sized,
{
    let left = splits.left_of(idx);
    let right = splits.right_of(idx);
    for (class, _) in ranked_values(splits.split_values(idx)) {
        let abundance_left = abundance(class, left);
        let abundance_right = abundance(class, right);
        if abundance_left > abundance_right {
            return Ok((MergeDirection::Left, false));
        }
        if abundance_right > abundance_left {
            return Ok((MergeDirection::Right, false));
        }
    }

    let last = splits.len() - 1;
    let len = splits.split_len(idx);
    if idx == 1 && len > splits.split_len(0) {
        return Ok((MergeDirection::Left, false));
    }
    if idx + 1 == last && len > splits.split_len(last) {
        return Ok((MergeDirection::Right, false));
    }

    let direction = if rng.bit() == 0 {
        MergeDirection::Left
    } else {
        MergeDirection::Right
    };
    Ok((direction, true))
}

/// Mean over the edge's distinct values of the product of their abundance
/// in the edge and in its neighbour.
fn edge_similarity<L: Label>(edge: &[L], neighbour: &[L]) -> f64 {
    let counts = value_counts(edge);
    if counts.is_empty() {
        return 0.0;
    }
    let total = counts
        .iter()
        .map(|&(value, _)| abundance(value, edge) * abundance(value, neighbour))
        .sum::<f64>();
    total / counts.len() as f64
}

/// Picks which edge split to fold into its neighbour.
///
/// `Left` means the first split merges right, `Right` means the last split
/// merges left. The flag reports a random draw.
fn edge_to_merge<L, R>(
    splits: &SplitList<'_, L>,
    rng: &mut R,
) -> Result<(MergeDirection, bool), SegError>
where
    L: Label,
    R: TieBreaker + ?Sized,
{
    if splits.len() < 2 {
        return Err(SegError::invalid_input(format!(
            "edge merge requires at least 2 splits; got {}",
            splits.len()
        )));
    }

    let last = splits.len() - 1;
    let similarity_left = edge_similarity(splits.split_values(0), splits.split_values(1));
    let similarity_right =
        edge_similarity(splits.split_values(last), splits.split_values(last - 1));
    if similarity_left > similarity_right {
        return Ok((MergeDirection::Left, false));
    }
    if similarity_right > similarity_left {
        return Ok((MergeDirection::Right, false));
    }

    let left = splits.split_len(0);
    let adj_left = splits.split_len(1);
    let right = splits.split_len(last);
    let adj_right = splits.split_len(last - 1);
    if left < adj_left && right > adj_right {
        return Ok((MergeDirection::Left, false));
    }
    if left > adj_left && right < adj_right {
        return Ok((MergeDirection::Right, false));
    }
    if left < right {
        return Ok((MergeDirection::Left, false));
    }
    if left > right {
        return Ok((MergeDirection::Right, false));
    }

    let edge = if rng.bit() == 0 {
        MergeDirection::Left
    } else {
        MergeDirection::Right
    };
    Ok((edge, true))
}
