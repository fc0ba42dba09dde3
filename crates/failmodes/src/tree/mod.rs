//! Decision trees.
//!
//! - [`BinnedMatrix`]: per-feature quantization used while growing
//! - [`GainParams`]: split gain and leaf weight formulas
//! - [`TreeGrower`]: histogram-based, depth-first tree growing
//! - [`Tree`]: immutable SoA tree used at prediction time

mod bins;
mod gain;
mod grower;
mod repr;

pub use bins::{BinMapper, BinnedMatrix, MAX_BINS};
pub use gain::GainParams;
pub use grower::{GrowerParams, TreeGrower};
pub use repr::{NodeId, Tree, TreeValidationError};

/// Hard depth limit for trees declared "unlimited".
pub const DEPTH_CAP: u32 = 48;
