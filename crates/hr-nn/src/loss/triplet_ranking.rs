// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use super::{TripletGradients, TripletLoss};
use crate::batch::TripletBatch;
use crate::{PureResult, Tensor, TensorError};
use hr_config::determinism;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smooth or piecewise-linear penalty applied to `z = d_pos - d_neg + margin`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingSurrogate {
    /// `softplus(z)`, differentiable everywhere.
    #[default]
    Logistic,
    /// `max(0, z)`; the kink at `z = 0` takes the zero subgradient.
    Hinge,
}

fn relu(z: f64) -> f64 {
    // NaN must fall through rather than collapse to zero.
    if z < 0.0 {
        0.0
    } else {
        z
    }
}

impl RankingSurrogate {
    fn value(self, z: f64) -> f64 {
        match self {
            RankingSurrogate::Logistic => relu(z) + (-z.abs()).exp().ln_1p(),
            RankingSurrogate::Hinge => relu(z),
        }
    }

    fn slope(self, z: f64) -> f64 {
        match self {
            RankingSurrogate::Logistic => {
                if z >= 0.0 {
                    1.0 / (1.0 + (-z).exp())
                } else {
                    let e = z.exp();
                    e / (1.0 + e)
                }
            }
            RankingSurrogate::Hinge => {
                if z > 0.0 {
                    1.0
                } else if z.is_nan() {
                    z
                } else {
                    0.0
                }
            }
        }
    }
}

/// Hyperparameters of the triplet constraint ranking loss.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TripletRankingConfig {
    /// Weight of the similarity-preservation term `d_pos` against the
    /// ranking term.
    #[serde(alias = "lamda")]
    pub lambda: f32,
    /// Global loss multiplier.
    pub scale: f32,
    /// Expected embedding length; inputs of any other width are rejected.
    pub codelength: usize,
    /// Gap the different pair must keep over the similar pair.
    pub margin: f32,
    pub surrogate: RankingSurrogate,
}

impl Default for TripletRankingConfig {
    fn default() -> Self {
        Self {
            lambda: 0.5,
            scale: 1.0,
            codelength: 32,
            margin: 1.0,
            surrogate: RankingSurrogate::Logistic,
        }
    }
}

impl TripletRankingConfig {
    pub fn new(lambda: f32, scale: f32, codelength: usize) -> Self {
        Self {
            lambda,
            scale,
            codelength,
            ..Self::default()
        }
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_surrogate(mut self, surrogate: RankingSurrogate) -> Self {
        self.surrogate = surrogate;
        self
    }

    pub fn validate(&self) -> PureResult<()> {
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(TensorError::InvalidValue {
                label: "lambda must be finite and non-negative",
            });
        }
        if !self.scale.is_finite() {
            return Err(TensorError::InvalidValue {
                label: "scale must be finite",
            });
        }
        if self.codelength == 0 {
            return Err(TensorError::InvalidDimensions { rows: 1, cols: 0 });
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(TensorError::InvalidValue {
                label: "margin must be finite and non-negative",
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields fall back
    /// to [`TripletRankingConfig::default`].
    pub fn from_json_str(raw: &str) -> PureResult<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| TensorError::SerializationError {
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, Copy, Debug)]
struct RowTerms {
    d_pos: f64,
    d_neg: f64,
    z: f64,
}

/// Stateless forward/backward kernel of the triplet constraint ranking loss.
///
/// For triplet `(o, s, d)` of length `L`:
///
/// ```text
/// d_pos = |o - s|^2 / L
/// d_neg = |o - d|^2 / L
/// row   = surrogate(d_pos - d_neg + margin) + lambda * d_pos
/// loss  = loss_weight * scale * mean(row)
/// ```
///
/// Backward recomputes the row terms from the replayed batch; nothing is
/// cached between calls. Rows run on the rayon pool and the reduction is
/// always done in row order, so identical inputs give identical bits.
#[derive(Clone, Debug)]
pub struct TripletRankingLoss {
    config: TripletRankingConfig,
}

impl TripletRankingLoss {
    pub fn new(config: TripletRankingConfig) -> PureResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TripletRankingConfig {
        &self.config
    }

    /// Rejects batches whose width differs from the configured codelength.
    pub fn check_batch(&self, batch: &TripletBatch) -> PureResult<()> {
        let (rows, cols) = batch.shape();
        if cols != self.config.codelength {
            return Err(TensorError::ShapeMismatch {
                left: (rows, cols),
                right: (rows, self.config.codelength),
            });
        }
        Ok(())
    }

    fn row_terms(&self, o: &[f32], s: &[f32], d: &[f32]) -> RowTerms {
        let inv_len = 1.0 / o.len() as f64;
        let mut pos = 0.0f64;
        let mut neg = 0.0f64;
        for ((&a, &b), &c) in o.iter().zip(s).zip(d) {
            let dp = a as f64 - b as f64;
            let dn = a as f64 - c as f64;
            pos += dp * dp;
            neg += dn * dn;
        }
        let d_pos = pos * inv_len;
        let d_neg = neg * inv_len;
        RowTerms {
            d_pos,
            d_neg,
            z: d_pos - d_neg + self.config.margin as f64,
        }
    }

    fn row_loss(&self, terms: RowTerms) -> f64 {
        self.config.surrogate.value(terms.z) + self.config.lambda as f64 * terms.d_pos
    }

    fn map_rows<F>(&self, batch: &TripletBatch, f: F) -> Vec<f64>
    where
        F: Fn(RowTerms) -> f64 + Sync,
    {
        self.map_rows_in(batch, determinism::lock_reduction_order(), f)
    }

    fn map_rows_in<F>(&self, batch: &TripletBatch, sequential: bool, f: F) -> Vec<f64>
    where
        F: Fn(RowTerms) -> f64 + Sync,
    {
        let eval = |index: usize| {
            let (o, s, d) = batch.triplet(index);
            f(self.row_terms(o, s, d))
        };
        if sequential {
            (0..batch.rows()).map(eval).collect()
        } else {
            (0..batch.rows()).into_par_iter().map(eval).collect()
        }
    }

    /// Unscaled per-row loss `surrogate(z) + lambda * d_pos`.
    pub fn row_losses(&self, batch: &TripletBatch) -> PureResult<Vec<f32>> {
        self.check_batch(batch)?;
        Ok(self
            .map_rows(batch, |terms| self.row_loss(terms))
            .into_iter()
            .map(|value| value as f32)
            .collect())
    }

    /// Per-row `(d_pos, d_neg)` pairs, useful for monitoring how well the
    /// codes separate similar and different samples.
    pub fn row_distances(&self, batch: &TripletBatch) -> PureResult<Vec<(f32, f32)>> {
        self.check_batch(batch)?;
        let pos = self.map_rows(batch, |terms| terms.d_pos);
        let neg = self.map_rows(batch, |terms| terms.d_neg);
        Ok(pos
            .into_iter()
            .zip(neg)
            .map(|(p, n)| (p as f32, n as f32))
            .collect())
    }

    fn batch_loss(&self, batch: &TripletBatch, sequential: bool) -> PureResult<f32> {
        self.check_batch(batch)?;
        let per_row = self.map_rows_in(batch, sequential, |terms| self.row_loss(terms));
        let sum: f64 = per_row.iter().sum();
        Ok((self.config.scale as f64 * sum / batch.rows() as f64) as f32)
    }

    fn gradients(
        &self,
        batch: &TripletBatch,
        top_grad: f32,
        sequential: bool,
    ) -> PureResult<TripletGradients> {
        self.check_batch(batch)?;
        let (rows, cols) = batch.shape();
        let coeff = 2.0 * top_grad as f64 * self.config.scale as f64 / (rows * cols) as f64;
        let lambda = self.config.lambda as f64;
        let surrogate = self.config.surrogate;

        let fill = |index: usize, go: &mut [f32], gs: &mut [f32], gd: &mut [f32]| {
            let (o, s, d) = batch.triplet(index);
            let terms = self.row_terms(o, s, d);
            let slope = surrogate.slope(terms.z);
            let pull = coeff * (slope + lambda);
            let push = coeff * slope;
            for k in 0..cols {
                let ds = o[k] as f64 - s[k] as f64;
                let dd = o[k] as f64 - d[k] as f64;
                go[k] = (pull * ds - push * dd) as f32;
                gs[k] = (-pull * ds) as f32;
                gd[k] = (push * dd) as f32;
            }
        };

        let mut grad_o = vec![0.0f32; rows * cols];
        let mut grad_s = vec![0.0f32; rows * cols];
        let mut grad_d = vec![0.0f32; rows * cols];
        if sequential {
            grad_o
                .chunks_mut(cols)
                .zip(grad_s.chunks_mut(cols))
                .zip(grad_d.chunks_mut(cols))
                .enumerate()
                .for_each(|(index, ((go, gs), gd))| fill(index, go, gs, gd));
        } else {
            grad_o
                .par_chunks_mut(cols)
                .zip(grad_s.par_chunks_mut(cols))
                .zip(grad_d.par_chunks_mut(cols))
                .enumerate()
                .for_each(|(index, ((go, gs), gd))| fill(index, go, gs, gd));
        }

        Ok(TripletGradients {
            original: Tensor::from_vec(rows, cols, grad_o)?,
            similar: Tensor::from_vec(rows, cols, grad_s)?,
            different: Tensor::from_vec(rows, cols, grad_d)?,
        })
    }
}

impl TripletLoss for TripletRankingLoss {
    fn forward(&self, batch: &TripletBatch, loss_weight: f32) -> PureResult<f32> {
        let loss = self.batch_loss(batch, determinism::lock_reduction_order())?;
        debug!(
            rows = batch.rows(),
            codelength = batch.codelength(),
            loss,
            loss_weight,
            "triplet ranking forward"
        );
        Ok(loss * loss_weight)
    }

    fn backward(&self, batch: &TripletBatch, top_grad: f32) -> PureResult<TripletGradients> {
        let gradients = self.gradients(batch, top_grad, determinism::lock_reduction_order())?;
        debug!(
            rows = batch.rows(),
            codelength = batch.codelength(),
            top_grad,
            "triplet ranking backward"
        );
        Ok(gradients)
    }
}
