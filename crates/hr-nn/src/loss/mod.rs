// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

mod triplet_ranking;

use crate::batch::{TripletBatch, TripletRole};
use crate::{PureResult, Tensor};

pub use triplet_ranking::{RankingSurrogate, TripletRankingConfig, TripletRankingLoss};

/// Trait implemented by differentiable losses over triplet batches.
pub trait TripletLoss {
    /// Computes the scalar loss multiplied by `loss_weight`.
    fn forward(&self, batch: &TripletBatch, loss_weight: f32) -> PureResult<f32>;

    /// Returns the gradient of `top_grad * loss` with respect to each input.
    fn backward(&self, batch: &TripletBatch, top_grad: f32) -> PureResult<TripletGradients>;
}

/// Gradients mirroring the three inputs of a [`TripletBatch`].
#[derive(Clone, Debug, PartialEq)]
pub struct TripletGradients {
    pub original: Tensor,
    pub similar: Tensor,
    pub different: Tensor,
}

impl TripletGradients {
    pub fn get(&self, role: TripletRole) -> &Tensor {
        match role {
            TripletRole::Original => &self.original,
            TripletRole::Similar => &self.similar,
            TripletRole::Different => &self.different,
        }
    }

    /// Gradients in bottom order: original, similar, different.
    pub fn into_array(self) -> [Tensor; 3] {
        [self.original, self.similar, self.different]
    }
}
