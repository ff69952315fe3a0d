// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-wide configuration shared by the HashRank crates: seeded RNGs for
//! reproducible fillers and the tracing subscriber used by binaries and tests.

pub mod determinism;
pub mod tracing;

pub use self::determinism::{
    lock_reduction_order, rng_from_label, rng_from_optional, DeterminismConfig,
};
pub use self::tracing::{init_tracing, InitError};
