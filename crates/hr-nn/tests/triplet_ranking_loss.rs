// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use hr_nn::{
    Blob, GradientChecker, RankingSurrogate, Tensor, TensorError, TripletBatch, TripletLoss,
    TripletRankingConfig, TripletRankingLoss, TripletRankingLossLayer, TripletRole,
};

const SEED: u64 = 1701;

fn hashing_config() -> TripletRankingConfig {
    hr_nn::init_tracing();
    TripletRankingConfig::new(0.7, 10.0, 32)
}

fn gaussian_bottoms(seed: u64) -> Vec<Blob> {
    hr_nn::init_tracing();
    let (o, s, d) = TripletBatch::random_normal(3, 32, Some(seed))
        .unwrap()
        .into_parts();
    vec![
        Blob::new(o).unwrap(),
        Blob::new(s).unwrap(),
        Blob::new(d).unwrap(),
    ]
}

#[test]
fn loss_scales_linearly_with_loss_weight() {
    let bottoms = gaussian_bottoms(SEED);
    let mut top = Blob::scalar().unwrap();

    let mut unit = TripletRankingLossLayer::new(hashing_config()).unwrap();
    unit.setup(&bottoms, &mut top).unwrap();
    let loss_weight_1 = unit.forward(&bottoms, &mut top).unwrap();

    const LOSS_WEIGHT: f32 = 7.7;
    let mut weighted = TripletRankingLossLayer::new(hashing_config())
        .unwrap()
        .with_loss_weight(LOSS_WEIGHT)
        .unwrap();
    weighted.setup(&bottoms, &mut top).unwrap();
    let loss_weight_2 = weighted.forward(&bottoms, &mut top).unwrap();

    assert_relative_eq!(loss_weight_1 * LOSS_WEIGHT, loss_weight_2, max_relative = 1e-5);
    assert!(loss_weight_1.abs() >= 0.1);
}

#[test]
fn kernel_forward_matches_layer_forward() {
    let batch = TripletBatch::random_normal(3, 32, Some(SEED)).unwrap();
    let kernel = TripletRankingLoss::new(hashing_config()).unwrap();
    let (o, s, d) = batch.clone().into_parts();
    let bottoms = vec![
        Blob::new(o).unwrap(),
        Blob::new(s).unwrap(),
        Blob::new(d).unwrap(),
    ];
    let mut top = Blob::scalar().unwrap();
    let mut layer = TripletRankingLossLayer::new(hashing_config())
        .unwrap()
        .with_loss_weight(3.7)
        .unwrap();
    layer.setup(&bottoms, &mut top).unwrap();
    assert_eq!(
        layer.forward(&bottoms, &mut top).unwrap(),
        kernel.forward(&batch, 3.7).unwrap()
    );
}

#[test]
fn gradients_match_finite_differences() {
    let batch = TripletBatch::random_normal(3, 32, Some(SEED)).unwrap();
    let kernel = TripletRankingLoss::new(hashing_config()).unwrap();
    let checker = GradientChecker::new(1e-2, 1e-2).unwrap();
    let report = checker.check_exhaustive(&kernel, &batch, 3.7).unwrap();
    assert_eq!(report.checked, 3 * 3 * 32);
    assert_eq!(report.skipped, 0);
}

#[test]
fn gradients_match_finite_differences_per_input() {
    let batch = TripletBatch::random_normal(5, 32, Some(SEED + 10)).unwrap();
    let kernel = TripletRankingLoss::new(TripletRankingConfig::new(0.2, 4.0, 32).with_margin(0.5))
        .unwrap();
    let checker = GradientChecker::new(1e-2, 1e-2).unwrap();
    for role in TripletRole::ALL {
        let report = checker.check_input(&kernel, &batch, 1.0, role).unwrap();
        assert_eq!(report.checked, 5 * 32);
    }
}

#[test]
fn hinge_gradients_match_away_from_the_kink() {
    // Row 0 sits on the flat side (z ~ -0.995), row 1 on the linear side
    // (z ~ 2.98); a 1e-2 nudge cannot move either across z = 0.
    let batch = TripletBatch::new(
        Tensor::from_vec(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap(),
        Tensor::from_vec(2, 2, vec![0.9, 0.0, 0.0, -1.0]).unwrap(),
        Tensor::from_vec(2, 2, vec![-1.0, 0.0, 0.0, 1.2]).unwrap(),
    )
    .unwrap();
    let kernel = TripletRankingLoss::new(
        TripletRankingConfig::new(0.7, 10.0, 2).with_surrogate(RankingSurrogate::Hinge),
    )
    .unwrap();
    let grads = kernel.backward(&batch, 1.0).unwrap();
    assert_eq!(grads.different.row(0), &[0.0, 0.0]);
    assert!(grads.different.row(1).iter().any(|&g| g != 0.0));

    let checker = GradientChecker::new(1e-2, 1e-2).unwrap();
    let report = checker.check_exhaustive(&kernel, &batch, 1.0).unwrap();
    assert_eq!(report.checked, 3 * 2 * 2);
}

#[test]
fn layer_backward_matches_finite_differences() {
    let mut bottoms = gaussian_bottoms(SEED + 1);
    let mut top = Blob::scalar().unwrap();
    let mut layer = TripletRankingLossLayer::new(hashing_config())
        .unwrap()
        .with_loss_weight(3.7)
        .unwrap();
    layer.setup(&bottoms, &mut top).unwrap();
    layer.forward(&bottoms, &mut top).unwrap();
    layer.backward(&top, &[true; 3], &mut bottoms).unwrap();

    let step = 1e-2f32;
    for input in 0..3 {
        for index in [0usize, 17, 95] {
            let analytic = bottoms[input].diff().data()[index];
            let original = bottoms[input].data().data()[index];
            let mut probe = bottoms.clone();
            probe[input].data_mut().data_mut()[index] = original + step;
            let positive = layer.forward(&probe, &mut top).unwrap();
            probe[input].data_mut().data_mut()[index] = original - step;
            let negative = layer.forward(&probe, &mut top).unwrap();
            let numeric = (positive - negative) / (2.0 * step);
            let scale = analytic.abs().max(numeric.abs()).max(1.0);
            assert!(
                (analytic - numeric).abs() <= 1e-2 * scale,
                "input {input} index {index}: analytic {analytic} numeric {numeric}"
            );
        }
    }
}

#[test]
fn permuting_rows_permutes_gradients_and_keeps_loss() {
    let batch = TripletBatch::random_normal(4, 32, Some(SEED + 2)).unwrap();
    let order = [3usize, 1, 0, 2];
    let permuted = batch.permute_rows(&order).unwrap();
    let kernel = TripletRankingLoss::new(hashing_config()).unwrap();

    assert_relative_eq!(
        kernel.forward(&batch, 1.0).unwrap(),
        kernel.forward(&permuted, 1.0).unwrap(),
        max_relative = 1e-6
    );

    let base = kernel.backward(&batch, 2.0).unwrap();
    let moved = kernel.backward(&permuted, 2.0).unwrap();
    for role in TripletRole::ALL {
        for (new_row, &old_row) in order.iter().enumerate() {
            for (a, b) in moved
                .get(role)
                .row(new_row)
                .iter()
                .zip(base.get(role).row(old_row))
            {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-7);
            }
        }
    }
}

#[test]
fn mismatched_shapes_fail_with_invalid_argument() {
    let a = Tensor::random_normal(3, 32, 0.0, 1.0, Some(1)).unwrap();
    let short = Tensor::random_normal(2, 32, 0.0, 1.0, Some(2)).unwrap();
    let narrow = Tensor::random_normal(3, 31, 0.0, 1.0, Some(3)).unwrap();
    for err in [
        TripletBatch::new(a.clone(), short.clone(), a.clone()).unwrap_err(),
        TripletBatch::new(a.clone(), a.clone(), narrow.clone()).unwrap_err(),
        TripletBatch::new(narrow.clone(), a.clone(), a.clone()).unwrap_err(),
    ] {
        assert!(err.is_invalid_argument(), "{err}");
    }

    let mut top = Blob::scalar().unwrap();
    let bottoms = vec![
        Blob::new(a.clone()).unwrap(),
        Blob::new(a).unwrap(),
        Blob::new(short).unwrap(),
    ];
    let mut layer = TripletRankingLossLayer::new(hashing_config()).unwrap();
    let err = layer.setup(&bottoms, &mut top).unwrap_err();
    assert!(err.is_invalid_argument());

    assert_eq!(
        Tensor::zeros(3, 0).unwrap_err(),
        TensorError::InvalidDimensions { rows: 3, cols: 0 }
    );
}

#[test]
fn forward_is_deterministic() {
    let batch = TripletBatch::random_normal(8, 32, Some(SEED + 3)).unwrap();
    let kernel = TripletRankingLoss::new(hashing_config()).unwrap();
    let first = kernel.forward(&batch, 1.0).unwrap();
    let second = kernel.forward(&batch, 1.0).unwrap();
    assert_eq!(first.to_bits(), second.to_bits());
    assert_eq!(
        kernel.backward(&batch, 1.0).unwrap(),
        kernel.backward(&batch, 1.0).unwrap()
    );
}

#[test]
fn row_losses_average_to_the_batch_loss() {
    let batch = TripletBatch::random_normal(6, 32, Some(SEED + 4)).unwrap();
    let config = hashing_config();
    let kernel = TripletRankingLoss::new(config).unwrap();
    let rows = kernel.row_losses(&batch).unwrap();
    let mean = rows.iter().sum::<f32>() / rows.len() as f32;
    assert_relative_eq!(
        kernel.forward(&batch, 1.0).unwrap(),
        config.scale * mean,
        max_relative = 1e-5
    );
}
