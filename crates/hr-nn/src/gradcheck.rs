// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::batch::{TripletBatch, TripletRole};
use crate::loss::TripletLoss;
use crate::{PureResult, TensorError};
use tracing::debug;

/// Exhaustive central-difference check of a [`TripletLoss`] backward pass.
///
/// Every element of every input is nudged by `±step`; the numeric slope of
/// `loss_weight * loss` is compared with the analytic gradient using
/// `|analytic - numeric| <= threshold * max(|analytic|, |numeric|, 1)`.
/// Elements whose value lies within `kink_range` of `kink` are skipped, which
/// lets callers exclude points where the objective is not differentiable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientChecker {
    step: f32,
    threshold: f32,
    kink: f32,
    kink_range: f32,
}

/// Outcome of a successful check.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GradientReport {
    pub checked: usize,
    pub skipped: usize,
    /// Largest `|analytic - numeric|` seen.
    pub max_abs_error: f32,
    /// Largest error after dividing by the comparison scale.
    pub max_scaled_error: f32,
}

impl GradientChecker {
    pub fn new(step: f32, threshold: f32) -> PureResult<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(TensorError::InvalidValue {
                label: "finite-difference step must be positive",
            });
        }
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(TensorError::InvalidValue {
                label: "gradient threshold must be positive",
            });
        }
        Ok(Self {
            step,
            threshold,
            kink: 0.0,
            kink_range: -1.0,
        })
    }

    /// Skip inputs with `|x - kink| < kink_range`.
    pub fn with_kink(mut self, kink: f32, kink_range: f32) -> Self {
        self.kink = kink;
        self.kink_range = kink_range;
        self
    }

    pub fn check_exhaustive<L>(
        &self,
        loss: &L,
        batch: &TripletBatch,
        loss_weight: f32,
    ) -> PureResult<GradientReport>
    where
        L: TripletLoss + ?Sized,
    {
        let mut report = GradientReport::default();
        for role in TripletRole::ALL {
            let partial = self.check_input(loss, batch, loss_weight, role)?;
            report.checked += partial.checked;
            report.skipped += partial.skipped;
            report.max_abs_error = report.max_abs_error.max(partial.max_abs_error);
            report.max_scaled_error = report.max_scaled_error.max(partial.max_scaled_error);
        }
        Ok(report)
    }

    /// Checks the gradient of a single input.
    pub fn check_input<L>(
        &self,
        loss: &L,
        batch: &TripletBatch,
        loss_weight: f32,
        role: TripletRole,
    ) -> PureResult<GradientReport>
    where
        L: TripletLoss + ?Sized,
    {
        let analytic = loss.backward(batch, loss_weight)?;
        let analytic = analytic.get(role).data();
        let mut probe = batch.clone();
        let mut report = GradientReport::default();

        for (index, &expected) in analytic.iter().enumerate() {
            let original = probe.input(role).data()[index];
            if (original - self.kink).abs() < self.kink_range {
                report.skipped += 1;
                continue;
            }
            probe.input_mut(role)[index] = original + self.step;
            let positive = loss.forward(&probe, loss_weight)?;
            probe.input_mut(role)[index] = original - self.step;
            let negative = loss.forward(&probe, loss_weight)?;
            probe.input_mut(role)[index] = original;

            let numeric = (positive - negative) / (2.0 * self.step);
            let error = (expected - numeric).abs();
            let scale = expected.abs().max(numeric.abs()).max(1.0);
            if !(error <= self.threshold * scale) {
                return Err(TensorError::GradientCheckFailed {
                    input: role.index(),
                    index,
                    analytic: expected,
                    numeric,
                });
            }
            report.checked += 1;
            report.max_abs_error = report.max_abs_error.max(error);
            report.max_scaled_error = report.max_scaled_error.max(error / scale);
        }
        debug!(
            input = role.label(),
            checked = report.checked,
            skipped = report.skipped,
            max_abs_error = report.max_abs_error,
            "gradient check passed"
        );
        Ok(report)
    }
}
