// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use trajseg_core::{Label, SegError, validate_labels};

/// Half-open index range `[start, end)` into a label sequence.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Split {
    pub start: usize,
    pub end: usize,
}

impl Split {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn values<'a, L>(&self, labels: &'a [L]) -> &'a [L] {
        &labels[self.start..self.end]
    }
}

/// Ordered partition of one borrowed label sequence into contiguous splits.
///
/// Splits never overlap, never leave gaps and always cover the whole
/// sequence. Merging two neighbours is a range union; no values are copied.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitList<'a, L> {
    labels: &'a [L],
    splits: Vec<Split>,
}

impl<'a, L: Label> SplitList<'a, L> {
    /// Partitions `labels` into maximal runs of equal values.
    pub fn from_labels(labels: &'a [L]) -> Result<Self, SegError> {
        validate_labels(labels)?;

        let mut splits = Vec::new();
        let mut start = 0usize;
        for end in find_change_points(labels) {
            splits.push(Split { start, end });
            start = end;
        }
        splits.push(Split {
            start,
            end: labels.len(),
        });

        Ok(Self { labels, splits })
    }

    /// Partitions `labels` at explicit, strictly increasing `change_points`.
    pub fn from_change_points(labels: &'a [L], change_points: &[usize]) -> Result<Self, SegError> {
        validate_labels(labels)?;
        let n = labels.len();

        let mut splits = Vec::with_capacity(change_points.len() + 1);
        let mut start = 0usize;
        for (idx, &cp) in change_points.iter().enumerate() {
            if cp <= start || cp >= n {
                return Err(SegError::invalid_input(format!(
                    "change points must be strictly increasing within [1, {}]; change_points[{idx}]={cp}",
                    n.saturating_sub(1)
                )));
            }
            splits.push(Split { start, end: cp });
            start = cp;
        }
        splits.push(Split { start, end: n });

        Ok(Self { labels, splits })
    }

    /// Rebuilds a split list from ranges produced by an earlier reduction.
    pub fn from_splits(labels: &'a [L], splits: Vec<Split>) -> Result<Self, SegError> {
        validate_labels(labels)?;

        let mut cursor = 0usize;
        for (idx, split) in splits.iter().enumerate() {
            if split.start != cursor || split.is_empty() {
                return Err(SegError::invalid_input(format!(
                    "splits must be non-empty and contiguous; splits[{idx}]=[{}, {}) but expected start={cursor}",
                    split.start, split.end
                )));
            }
            cursor = split.end;
        }
        if cursor != labels.len() {
            return Err(SegError::invalid_input(format!(
                "splits must cover the whole sequence; covered {cursor} of {} values",
                labels.len()
            )));
        }

        Ok(Self { labels, splits })
    }

    pub fn labels(&self) -> &'a [L] {
        self.labels
    }

    pub fn splits(&self) -> &[Split] {
        self.splits.as_slice()
    }

    pub fn into_splits(self) -> Vec<Split> {
        self.splits
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    /// Always `false`: a split list covers a non-empty sequence.
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub fn split_values(&self, idx: usize) -> &'a [L] {
        self.splits[idx].values(self.labels)
    }

    pub fn split_len(&self, idx: usize) -> usize {
        self.splits[idx].len()
    }

    /// Every value strictly left of split `idx`.
    pub fn left_of(&self, idx: usize) -> &'a [L] {
        &self.labels[..self.splits[idx].start]
    }

    /// Every value strictly right of split `idx`.
    pub fn right_of(&self, idx: usize) -> &'a [L] {
        &self.labels[self.splits[idx].end..]
    }

    /// Cumulative boundary indices between consecutive splits.
    pub fn change_points(&self) -> Vec<usize> {
        self.splits[..self.splits.len().saturating_sub(1)]
            .iter()
            .map(|split| split.end)
            .collect()
    }

    pub fn segment_lengths(&self) -> Vec<usize> {
        self.splits.iter().map(Split::len).collect()
    }

    /// Concatenates the values of every split in order.
    pub fn concat(&self) -> Vec<L> {
        self.splits
            .iter()
            .flat_map(|split| split.values(self.labels).iter().copied())
            .collect()
    }

    /// Absorbs split `idx` into its left neighbour.
    pub fn merge_left(&mut self, idx: usize) -> Result<(), SegError> {
        if idx == 0 || idx >= self.splits.len() {
            return Err(SegError::invalid_input(format!(
                "merge_left requires 1 <= idx < {}; got idx={idx}",
                self.splits.len()
            )));
        }
        self.splits[idx - 1].end = self.splits[idx].end;
        self.splits.remove(idx);
        Ok(())
    }

    /// Absorbs split `idx` into its right neighbour.
    pub fn merge_right(&mut self, idx: usize) -> Result<(), SegError> {
        if idx + 1 >= self.splits.len() {
            return Err(SegError::invalid_input(format!(
                "merge_right requires idx + 1 < {}; got idx={idx}",
                self.splits.len()
            )));
        }
        self.splits[idx].end = self.splits[idx + 1].end;
        self.splits.remove(idx + 1);
        Ok(())
    }
}

/// Splits `labels` into maximal contiguous runs of equal value.
///
/// Fails with [`SegError::InvalidInput`] on an empty sequence.
pub fn split<L: Label>(labels: &[L]) -> Result<SplitList<'_, L>, SegError> {
    SplitList::from_labels(labels)
}

/// Positions `i` where `labels[i - 1] != labels[i]`.
pub fn find_change_points<L: Label>(labels: &[L]) -> Vec<usize> {
    labels
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] != pair[1])
        .map(|(idx, _)| idx + 1)
        .collect()
}
