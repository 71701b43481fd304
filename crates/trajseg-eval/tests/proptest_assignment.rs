// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use trajseg_eval::{assign_change_points, evaluate_change_points};

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

/// Minimum total cost over every injective map from the smaller set.
fn brute_force_cost(truth: &[usize], predicted: &[usize]) -> usize {
    let (rows, cols) = if truth.len() <= predicted.len() {
        (truth, predicted)
    } else {
        (predicted, truth)
    };
    let mut used = vec![false; cols.len()];
    search(rows, cols, 0, &mut used)
}

fn search(rows: &[usize], cols: &[usize], row: usize, used: &mut [bool]) -> usize {
    if row == rows.len() {
        return 0;
    }
    let mut best = usize::MAX;
    for col in 0..cols.len() {
        if used[col] {
            continue;
        }
        used[col] = true;
        let rest = search(rows, cols, row + 1, used);
        used[col] = false;
        best = best.min(rows[row].abs_diff(cols[col]) + rest);
    }
    best
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_assignment.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn assignment_matches_brute_force_optimum(
        truth in prop::collection::vec(0usize..200, 0..6),
        predicted in prop::collection::vec(0usize..200, 0..6),
    ) {
        let pairs = assign_change_points(&truth, &predicted).expect("assignment should succeed");
        prop_assert_eq!(pairs.len(), truth.len().min(predicted.len()));

        let mut seen_true = vec![false; truth.len()];
        let mut seen_pred = vec![false; predicted.len()];
        for &(t, p) in &pairs {
            prop_assert!(!seen_true[t] && !seen_pred[p]);
            seen_true[t] = true;
            seen_pred[p] = true;
        }
        for pair in pairs.windows(2) {
            prop_assert!(pair[0].0 < pair[1].0);
        }

        let cost: usize = pairs.iter().map(|&(t, p)| truth[t].abs_diff(predicted[p])).sum();
        prop_assert_eq!(cost, brute_force_cost(&truth, &predicted));
    }

    #[test]
    fn evaluation_counts_are_consistent(
        truth in prop::collection::vec(0usize..200, 0..6),
        predicted in prop::collection::vec(0usize..200, 0..6),
        threshold in 0usize..20,
    ) {
        let evaluation = evaluate_change_points(&truth, &predicted, threshold)
            .expect("evaluation should succeed");
        prop_assert_eq!(evaluation.tp + evaluation.fp, predicted.len());
        prop_assert_eq!(evaluation.tp + evaluation.fn_, truth.len());
        prop_assert_eq!(evaluation.squared_error.len(), evaluation.tp);
        for &err in &evaluation.squared_error {
            prop_assert!(err < (threshold * threshold) as f64 || threshold == 0);
        }
    }
}
