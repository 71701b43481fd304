// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use trajseg_fit::{KernelFitConfig, KernelSegmenter, KernelSpec, Stopping};

fn step_series(n: usize) -> Vec<f64> {
    let mut values = vec![0.4; n];
    for v in values.iter_mut().skip(n / 2) {
        *v = 1.2;
    }
    values
}

fn bench_kernel_fit(c: &mut Criterion, case_id: &str, n: usize, config: KernelFitConfig) {
    let values = step_series(n);
    let segmenter = KernelSegmenter::new(config).expect("segmenter config should be valid");

    c.bench_function(case_id, |b| {
        b.iter(|| {
            segmenter
                .fit(black_box(values.as_slice()))
                .expect("kernel fit benchmark should succeed");
        })
    });
}

fn benchmark_linear_penalized_n200(c: &mut Criterion) {
    bench_kernel_fit(c, "kernel_fit_linear_penalized_n200", 200, KernelFitConfig::default());
}

fn benchmark_rbf_known_k_n200(c: &mut Criterion) {
    bench_kernel_fit(
        c,
        "kernel_fit_rbf_known_k1_n200",
        200,
        KernelFitConfig {
            kernel: KernelSpec::Rbf { gamma: None },
            stopping: Stopping::KnownK(1),
            min_segment_len: 5,
        },
    );
}

criterion_group!(
    benches,
    benchmark_linear_penalized_n200,
    benchmark_rbf_known_k_n200
);
criterion_main!(benches);
