// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::batch::{TripletBatch, TripletRole};
use crate::loss::{TripletLoss, TripletRankingConfig, TripletRankingLoss};
use crate::{PureResult, Tensor, TensorError};
use tracing::debug;

const BOTTOMS: usize = 3;

/// Value and gradient buffers of one layer input or output.
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    data: Tensor,
    diff: Tensor,
}

impl Blob {
    /// Wraps `data` with a zeroed gradient of the same shape.
    pub fn new(data: Tensor) -> PureResult<Self> {
        let (rows, cols) = data.shape();
        Ok(Self {
            diff: Tensor::zeros(rows, cols)?,
            data,
        })
    }

    /// Scalar slot used for loss outputs.
    pub fn scalar() -> PureResult<Self> {
        Self::new(Tensor::zeros(1, 1)?)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    pub fn data(&self) -> &Tensor {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Tensor {
        &mut self.data
    }

    pub fn diff(&self) -> &Tensor {
        &self.diff
    }

    pub fn diff_mut(&mut self) -> &mut Tensor {
        &mut self.diff
    }

    /// Resizes both buffers, zeroing them when the shape changes.
    pub fn reshape(&mut self, rows: usize, cols: usize) -> PureResult<()> {
        if self.shape() != (rows, cols) {
            self.data = Tensor::zeros(rows, cols)?;
            self.diff = Tensor::zeros(rows, cols)?;
        }
        Ok(())
    }
}

/// Layer facade over [`TripletRankingLoss`] following the setup / forward /
/// backward convention of host training frameworks.
///
/// Bottoms are `[original, similar, different]`, each `N x codelength`. The
/// single top holds the unweighted loss in `data` and the loss weight in
/// `diff`; `forward` returns their product, `backward` uses `diff` as the
/// upstream gradient.
#[derive(Clone, Debug)]
pub struct TripletRankingLossLayer {
    kernel: TripletRankingLoss,
    loss_weight: f32,
    setup_shape: Option<(usize, usize)>,
    forward_shape: Option<(usize, usize)>,
}

impl TripletRankingLossLayer {
    pub fn new(config: TripletRankingConfig) -> PureResult<Self> {
        Ok(Self {
            kernel: TripletRankingLoss::new(config)?,
            loss_weight: 1.0,
            setup_shape: None,
            forward_shape: None,
        })
    }

    /// Sets the weight the surrounding graph applies to this loss.
    pub fn with_loss_weight(mut self, loss_weight: f32) -> PureResult<Self> {
        if !loss_weight.is_finite() {
            return Err(TensorError::InvalidValue {
                label: "loss_weight must be finite",
            });
        }
        self.loss_weight = loss_weight;
        Ok(self)
    }

    pub fn loss_weight(&self) -> f32 {
        self.loss_weight
    }

    pub fn kernel(&self) -> &TripletRankingLoss {
        &self.kernel
    }

    fn batch_from(&self, bottoms: &[Blob]) -> PureResult<TripletBatch> {
        if bottoms.len() != BOTTOMS {
            return Err(TensorError::DataLength {
                expected: BOTTOMS,
                got: bottoms.len(),
            });
        }
        let batch = TripletBatch::new(
            bottoms[0].data().clone(),
            bottoms[1].data().clone(),
            bottoms[2].data().clone(),
        )?;
        self.kernel.check_batch(&batch)?;
        Ok(batch)
    }

    fn expect_shape(
        expected: Option<(usize, usize)>,
        batch: &TripletBatch,
        missing: &'static str,
    ) -> PureResult<()> {
        let expected = expected.ok_or(TensorError::InvalidValue { label: missing })?;
        if batch.shape() != expected {
            return Err(TensorError::ShapeMismatch {
                left: batch.shape(),
                right: expected,
            });
        }
        Ok(())
    }

    /// Validates the bottoms and prepares the scalar top.
    pub fn setup(&mut self, bottoms: &[Blob], top: &mut Blob) -> PureResult<()> {
        let batch = self.batch_from(bottoms)?;
        top.reshape(1, 1)?;
        top.diff_mut().fill(self.loss_weight);
        self.setup_shape = Some(batch.shape());
        self.forward_shape = None;
        debug!(
            rows = batch.rows(),
            codelength = batch.codelength(),
            loss_weight = self.loss_weight,
            "triplet ranking layer set up"
        );
        Ok(())
    }

    /// Writes the loss into `top.data` and returns it scaled by `top.diff`.
    pub fn forward(&mut self, bottoms: &[Blob], top: &mut Blob) -> PureResult<f32> {
        let batch = self.batch_from(bottoms)?;
        Self::expect_shape(self.setup_shape, &batch, "forward called before setup")?;
        if top.shape() != (1, 1) {
            return Err(TensorError::ShapeMismatch {
                left: top.shape(),
                right: (1, 1),
            });
        }
        let loss = self.kernel.forward(&batch, 1.0)?;
        top.data_mut().data_mut()[0] = loss;
        self.forward_shape = Some(batch.shape());
        Ok(loss * top.diff().data()[0])
    }

    /// Writes gradients into the diffs of the bottoms flagged in
    /// `propagate_down`; other diffs are left as they are.
    pub fn backward(
        &self,
        top: &Blob,
        propagate_down: &[bool],
        bottoms: &mut [Blob],
    ) -> PureResult<()> {
        if propagate_down.len() != BOTTOMS {
            return Err(TensorError::DataLength {
                expected: BOTTOMS,
                got: propagate_down.len(),
            });
        }
        let batch = self.batch_from(bottoms)?;
        Self::expect_shape(self.forward_shape, &batch, "backward called before forward")?;
        if !propagate_down.iter().any(|&flag| flag) {
            return Ok(());
        }
        for role in TripletRole::ALL {
            let diff_shape = bottoms[role.index()].diff().shape();
            if propagate_down[role.index()] && diff_shape != batch.shape() {
                return Err(TensorError::ShapeMismatch {
                    left: diff_shape,
                    right: batch.shape(),
                });
            }
        }
        if top.diff().shape() != (1, 1) {
            return Err(TensorError::ShapeMismatch {
                left: top.diff().shape(),
                right: (1, 1),
            });
        }
        let top_grad = top.diff().data()[0];
        let gradients = self.kernel.backward(&batch, top_grad)?;
        for role in TripletRole::ALL {
            if propagate_down[role.index()] {
                bottoms[role.index()]
                    .diff_mut()
                    .data_mut()
                    .copy_from_slice(gradients.get(role).data());
            }
        }
        Ok(())
    }
}
