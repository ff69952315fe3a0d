// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Dense row-major `f32` tensors used by the HashRank loss kernels.
//!
//! The container is intentionally small: a `(rows, cols)` matrix where each
//! row holds one sample's embedding. Constructors validate the shape eagerly
//! so kernels can rely on non-empty, consistently sized buffers.

mod error;
mod tensor;

pub use error::{PureResult, TensorError};
pub use tensor::Tensor;
