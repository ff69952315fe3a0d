// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Runs in its own test binary: the determinism snapshot is process-wide, so
//! every test installs the same configuration before touching the kernel.

use approx::assert_relative_eq;
use hr_config::determinism::{self, DeterminismConfig};
use hr_nn::{
    GradientChecker, TripletBatch, TripletLoss, TripletRankingConfig, TripletRankingLoss,
};

const BASE_SEED: u64 = 7;

fn deterministic() -> &'static DeterminismConfig {
    hr_nn::init_tracing();
    determinism::configure(DeterminismConfig {
        enabled: true,
        base_seed: BASE_SEED,
        fix_reduction: true,
    })
}

#[test]
fn configured_snapshot_locks_reduction_order() {
    let cfg = deterministic();
    assert!(cfg.enabled);
    assert_eq!(cfg.base_seed, BASE_SEED);
    assert!(determinism::lock_reduction_order());
    assert_eq!(determinism::config().base_seed, BASE_SEED);
}

#[test]
fn unseeded_fillers_repeat_under_configured_seed() {
    deterministic();
    let first = TripletBatch::random_normal(3, 32, None).unwrap();
    let second = TripletBatch::random_normal(3, 32, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn sequential_kernel_matches_row_losses_and_passes_gradient_check() {
    deterministic();
    let batch = TripletBatch::random_normal(5, 32, Some(99)).unwrap();
    let loss = TripletRankingLoss::new(TripletRankingConfig::new(0.7, 10.0, 32)).unwrap();

    let value = loss.forward(&batch, 1.0).unwrap();
    assert_eq!(value.to_bits(), loss.forward(&batch, 1.0).unwrap().to_bits());
    let rows = loss.row_losses(&batch).unwrap();
    let mean = rows.iter().map(|&r| r as f64).sum::<f64>() / rows.len() as f64;
    assert_relative_eq!(value, (10.0 * mean) as f32, max_relative = 1e-5);

    let report = GradientChecker::new(1e-2, 1e-2)
        .unwrap()
        .check_exhaustive(&loss, &batch, 2.5)
        .unwrap();
    assert_eq!(report.checked, 3 * 5 * 32);
}
