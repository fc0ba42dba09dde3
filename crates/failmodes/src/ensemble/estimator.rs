//! Per-label binary estimator.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::boosted::GradientBoosted;
use super::forest::RandomForest;
use super::params::EnsembleParams;
use crate::error::{Error, Result};
use crate::tree::{BinnedMatrix, TreeValidationError};
use crate::utils::Parallelism;

/// A fitted binary probability model for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinaryEstimator {
    /// The label had a single class in the training data. `probability` is
    /// that class (0.0 or 1.0).
    Constant { probability: f32 },
    Forest(RandomForest),
    Gbdt(GradientBoosted),
}

impl BinaryEstimator {
    /// Fit one label.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyDataset`] for an empty target and
    /// [`Error::FamilyUnavailable`] when boosting was not compiled in.
    #[allow(unused_variables)]
    pub fn fit(
        x: ArrayView2<f32>,
        binned: &BinnedMatrix,
        y: &[u8],
        params: &EnsembleParams,
        seed: u64,
        stream: u64,
        parallelism: Parallelism,
    ) -> Result<Self> {
        let Some(&first) = y.first() else {
            return Err(Error::EmptyDataset);
        };
        if y.iter().all(|&v| v == first) {
            return Ok(BinaryEstimator::Constant {
                probability: f32::from(first),
            });
        }

        match params {
            EnsembleParams::Forest(p) => Ok(BinaryEstimator::Forest(RandomForest::fit(
                binned,
                y,
                p,
                seed,
                stream,
                parallelism,
            ))),
            #[cfg(feature = "gbdt")]
            EnsembleParams::Gbdt(p) => Ok(BinaryEstimator::Gbdt(GradientBoosted::fit(
                x,
                binned,
                y,
                p,
                seed,
                stream,
                parallelism,
            ))),
            #[cfg(not(feature = "gbdt"))]
            EnsembleParams::Gbdt(_) => Err(Error::FamilyUnavailable("gbdt")),
        }
    }

    /// Positive-class probability per row, in `[0, 1]`.
    pub fn predict(&self, x: ArrayView2<f32>, parallelism: Parallelism) -> Vec<f32> {
        match self {
            BinaryEstimator::Constant { probability } => vec![*probability; x.nrows()],
            BinaryEstimator::Forest(f) => f.predict(x, parallelism),
            BinaryEstimator::Gbdt(g) => g.predict(x, parallelism),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, BinaryEstimator::Constant { .. })
    }

    pub fn validate(&self, n_features: usize) -> std::result::Result<(), TreeValidationError> {
        match self {
            BinaryEstimator::Constant { .. } => Ok(()),
            BinaryEstimator::Forest(f) => f.validate(n_features),
            BinaryEstimator::Gbdt(g) => g.validate(n_features),
        }
    }
}
