// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use libfuzzer_sys::fuzz_target;
use trajseg_core::ScriptedTieBreaker;
use trajseg_merge::post_process;

// Byte layout: [k, n_classes, draw, labels...]. Labels are folded into a
// small alphabet so merges actually happen.
fuzz_target!(|data: &[u8]| {
    let Some((&header, rest)) = data.split_first() else {
        return;
    };
    let Some((&class_seed, rest)) = rest.split_first() else {
        return;
    };
    let Some((&draw, rest)) = rest.split_first() else {
        return;
    };

    let k = usize::from(header % 8);
    let n_classes = 1 + class_seed % 6;
    let labels = rest.iter().map(|b| b % n_classes).collect::<Vec<u8>>();
    let mut rng = ScriptedTieBreaker::constant(u64::from(draw));

    let reduction = match post_process(labels.as_slice(), k, &mut rng) {
        Ok(reduction) => reduction,
        Err(_) => {
            assert!(labels.is_empty(), "only empty input may be rejected");
            return;
        }
    };

    let n_runs = 1 + labels.windows(2).filter(|w| w[0] != w[1]).count();
    assert_eq!(reduction.classes.len(), reduction.change_points.len() + 1);
    assert_eq!(reduction.classes.len(), n_runs.min(k + 1));
    assert!(reduction.change_points.windows(2).all(|w| w[0] < w[1]));
    assert!(
        reduction
            .change_points
            .iter()
            .all(|&cp| cp > 0 && cp < labels.len())
    );
    assert_eq!(
        reduction.segment_lengths().iter().sum::<usize>(),
        labels.len()
    );
});
