// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

/// Result alias used throughout the HashRank crates.
pub type PureResult<T> = Result<T, TensorError>;

/// Errors emitted by tensors, loss kernels and record helpers.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TensorError {
    /// A constructor received a zero-sized axis.
    #[error("invalid tensor dimensions ({rows} x {cols}); both axes must be non-zero")]
    InvalidDimensions { rows: usize, cols: usize },
    /// Data provided to a constructor does not match the tensor shape.
    #[error("data length mismatch: expected {expected}, got {got}")]
    DataLength { expected: usize, got: usize },
    /// Operands that must share a shape do not.
    #[error("shape mismatch: left={left:?}, right={right:?} cannot be combined")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// Computation received an empty input.
    #[error("{0} must not be empty for this computation")]
    EmptyInput(&'static str),
    /// A hyperparameter or index fell outside its admissible range.
    #[error("invalid value: {label}")]
    InvalidValue { label: &'static str },
    /// Wrapper around I/O failures when persisting tensors or records.
    #[error("i/o error while handling tensor data: {message}")]
    IoError { message: String },
    /// Wrapper around serde failures.
    #[error("serialization error while handling tensor data: {message}")]
    SerializationError { message: String },
    /// Finite-difference estimate disagreed with an analytic gradient.
    #[error(
        "gradient check failed for input {input} at element {index}: analytic={analytic}, numeric={numeric}"
    )]
    GradientCheckFailed {
        input: usize,
        index: usize,
        analytic: f32,
        numeric: f32,
    },
}

impl TensorError {
    /// Whether the error stems from caller-supplied arguments (shapes,
    /// lengths or hyperparameters) rather than the environment.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            TensorError::InvalidDimensions { .. }
                | TensorError::DataLength { .. }
                | TensorError::ShapeMismatch { .. }
                | TensorError::EmptyInput(_)
                | TensorError::InvalidValue { .. }
        )
    }
}
