//! Tabular data handling.
//!
//! - [`Frame`] / [`Column`]: named-column tables with CSV I/O
//! - [`repair_negatives`]: median repair of invalid sensor readings
//! - [`describe`]: numeric column summaries
//! - [`split_indices`]: deterministic train/validation split

mod describe;
mod frame;
mod sanitize;

pub use describe::describe;
pub use frame::{Column, Frame};
pub use sanitize::repair_negatives;

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Deterministic shuffled train/validation split.
///
/// Returns `(train_idx, valid_idx)`. The validation part holds
/// `ceil(rows * valid_fraction)` rows.
pub fn split_indices(rows: usize, valid_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..rows).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let valid_len = ((rows as f64) * valid_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let valid_len = valid_len.min(rows);
    let (valid, train) = idx.split_at(valid_len);
    (train.to_vec(), valid.to_vec())
}
