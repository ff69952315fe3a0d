// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Triplet constraint ranking loss for learning compact hash codes.
//!
//! The crate pairs a stateless forward/backward kernel with a thin layer
//! facade that follows the setup/forward/backward convention of host training
//! frameworks, plus the helpers that feed it: triplet batches, packed triplet
//! image records and an exhaustive finite-difference gradient checker.

pub mod batch;
pub mod gradcheck;
pub mod io;
pub mod layer;
pub mod loss;
pub mod record;
pub mod telemetry;

pub use batch::{TripletBatch, TripletRole};
pub use gradcheck::{GradientChecker, GradientReport};
pub use io::{
    load_config_json, load_records_bincode, load_records_json, save_config_json,
    save_records_bincode, save_records_json,
};
pub use layer::{Blob, TripletRankingLossLayer};
pub use loss::{
    RankingSurrogate, TripletGradients, TripletLoss, TripletRankingConfig, TripletRankingLoss,
};
pub use record::{ImageFrame, TripletRecord};
pub use telemetry::init_tracing;

pub use hr_tensor::{PureResult, Tensor, TensorError};
