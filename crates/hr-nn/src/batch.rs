// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::record::TripletRecord;
use crate::{PureResult, Tensor, TensorError};

/// Position of an input inside a triplet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TripletRole {
    Original,
    Similar,
    Different,
}

impl TripletRole {
    pub const ALL: [TripletRole; 3] = [
        TripletRole::Original,
        TripletRole::Similar,
        TripletRole::Different,
    ];

    /// Bottom index used by the layer facade.
    pub fn index(self) -> usize {
        match self {
            TripletRole::Original => 0,
            TripletRole::Similar => 1,
            TripletRole::Different => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TripletRole::Original => "original",
            TripletRole::Similar => "similar",
            TripletRole::Different => "different",
        }
    }
}

/// Three parallel `N x L` batches; row `i` of each tensor forms triplet `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct TripletBatch {
    original: Tensor,
    similar: Tensor,
    different: Tensor,
}

impl TripletBatch {
    /// Bundles three tensors, rejecting any shape disagreement.
    pub fn new(original: Tensor, similar: Tensor, different: Tensor) -> PureResult<Self> {
        for other in [&similar, &different] {
            if other.shape() != original.shape() {
                return Err(TensorError::ShapeMismatch {
                    left: original.shape(),
                    right: other.shape(),
                });
            }
        }
        Ok(Self {
            original,
            similar,
            different,
        })
    }

    /// Gaussian-filled batch. Each role draws from its own stream so the three
    /// inputs are independent; `None` defers to the process determinism config.
    pub fn random_normal(rows: usize, cols: usize, seed: Option<u64>) -> PureResult<Self> {
        let seed_for = |offset: u64| seed.map(|s| s.wrapping_add(offset));
        Self::new(
            Tensor::random_normal(rows, cols, 0.0, 1.0, seed_for(0))?,
            Tensor::random_normal(rows, cols, 0.0, 1.0, seed_for(1))?,
            Tensor::random_normal(rows, cols, 0.0, 1.0, seed_for(2))?,
        )
    }

    /// Stacks packed records into a batch of pixel rows scaled to `[0, 1]`.
    pub fn from_records(records: &[TripletRecord]) -> PureResult<Self> {
        if records.is_empty() {
            return Err(TensorError::EmptyInput("triplet records"));
        }
        let mut original = Vec::with_capacity(records.len());
        let mut similar = Vec::with_capacity(records.len());
        let mut different = Vec::with_capacity(records.len());
        for record in records {
            let [o, s, d] = record.split_planes()?;
            original.push(o);
            similar.push(s);
            different.push(d);
        }
        Self::new(
            Tensor::from_rows(&original)?,
            Tensor::from_rows(&similar)?,
            Tensor::from_rows(&different)?,
        )
    }

    /// Number of triplets `N`.
    pub fn rows(&self) -> usize {
        self.original.rows()
    }

    /// Embedding length `L`.
    pub fn codelength(&self) -> usize {
        self.original.cols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.original.shape()
    }

    pub fn original(&self) -> &Tensor {
        &self.original
    }

    pub fn similar(&self) -> &Tensor {
        &self.similar
    }

    pub fn different(&self) -> &Tensor {
        &self.different
    }

    pub fn input(&self, role: TripletRole) -> &Tensor {
        match role {
            TripletRole::Original => &self.original,
            TripletRole::Similar => &self.similar,
            TripletRole::Different => &self.different,
        }
    }

    /// Mutable access for in-place perturbation. The shape cannot change
    /// through a slice, so the batch invariant holds.
    pub fn input_mut(&mut self, role: TripletRole) -> &mut [f32] {
        match role {
            TripletRole::Original => self.original.data_mut(),
            TripletRole::Similar => self.similar.data_mut(),
            TripletRole::Different => self.different.data_mut(),
        }
    }

    /// Returns the three rows of triplet `index`.
    pub fn triplet(&self, index: usize) -> (&[f32], &[f32], &[f32]) {
        (
            self.original.row(index),
            self.similar.row(index),
            self.different.row(index),
        )
    }

    /// Reorders triplets so that new row `i` is old row `order[i]`. The same
    /// order applies to all three inputs; `order` must be a permutation.
    pub fn permute_rows(&self, order: &[usize]) -> PureResult<Self> {
        if order.len() != self.rows() {
            return Err(TensorError::DataLength {
                expected: self.rows(),
                got: order.len(),
            });
        }
        let mut seen = vec![false; order.len()];
        for &index in order {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(TensorError::InvalidValue {
                        label: "row order must be a permutation",
                    })
                }
            }
        }
        Ok(Self {
            original: self.original.select_rows(order)?,
            similar: self.similar.select_rows(order)?,
            different: self.different.select_rows(order)?,
        })
    }

    pub fn into_parts(self) -> (Tensor, Tensor, Tensor) {
        (self.original, self.similar, self.different)
    }
}
