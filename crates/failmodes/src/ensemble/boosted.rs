//! Gradient-boosted trees with logistic loss for one binary label.
//!
//! Prediction is always available so that saved models load in any build;
//! training needs the `gbdt` feature.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::tree::{Tree, TreeValidationError};
use crate::utils::Parallelism;

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Fitted boosted ensemble: `p = sigmoid(base_score + sum(trees))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosted {
    base_score: f32,
    trees: Vec<Tree>,
}

impl GradientBoosted {
    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw margin of one row.
    #[inline]
    fn margin(&self, row: ArrayView1<f32>) -> f64 {
        self.base_score as f64 + self.trees.iter().map(|t| t.predict_row(row) as f64).sum::<f64>()
    }

    /// Positive-class probability per row.
    pub fn predict(&self, x: ArrayView2<f32>, parallelism: Parallelism) -> Vec<f32> {
        parallelism.maybe_par_map(0..x.nrows(), |r| sigmoid(self.margin(x.row(r))) as f32)
    }

    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        self.trees.iter().try_for_each(|t| t.validate(n_features))
    }
}

#[cfg(feature = "gbdt")]
mod training {
    use ndarray::ArrayView2;
    use rand::prelude::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::{GradientBoosted, sigmoid};
    use crate::ensemble::params::BoostParams;
    use crate::tree::{BinnedMatrix, GainParams, GrowerParams, TreeGrower};
    use crate::utils::{Parallelism, derive_seed};

    /// Probability clamp used for the initial margin.
    const BASE_EPS: f64 = 1e-6;
    /// Hessian floor.
    const MIN_HESS: f64 = 1e-6;

    impl GradientBoosted {
        /// Fit with Newton boosting on logistic loss.
        ///
        /// Rounds are sequential; round `t` draws its row and column samples
        /// from `derive_seed(seed, stream, t)`.
        pub fn fit(
            x: ArrayView2<f32>,
            binned: &BinnedMatrix,
            y: &[u8],
            params: &BoostParams,
            seed: u64,
            stream: u64,
            parallelism: Parallelism,
        ) -> Self {
            let n_rows = binned.n_rows();
            let n_features = binned.n_features();
            debug_assert_eq!(y.len(), n_rows);
            debug_assert_eq!(x.nrows(), n_rows);

            let mean = y.iter().map(|&v| v as f64).sum::<f64>() / n_rows.max(1) as f64;
            let mean = mean.clamp(BASE_EPS, 1.0 - BASE_EPS);
            let base_score = (mean / (1.0 - mean)).ln();

            let grower_params = GrowerParams {
                gain: GainParams {
                    reg_lambda: params.reg_lambda,
                    min_gain: 0.0,
                    min_child_weight: params.min_child_weight,
                    min_samples_leaf: 1,
                },
                max_depth: params.max_depth,
                learning_rate: params.learning_rate,
                features_per_node: None,
            };
            let n_cols = ((params.colsample_bytree as f64 * n_features as f64).round() as usize)
                .clamp(1, n_features.max(1));

            let mut margins = vec![base_score; n_rows];
            let mut grad = vec![0.0f32; n_rows];
            let mut hess = vec![0.0f32; n_rows];
            let mut trees = Vec::with_capacity(params.n_trees as usize);
            let all_features: Vec<u32> = (0..n_features as u32).collect();

            for round in 0..params.n_trees {
                let mut rng =
                    Xoshiro256PlusPlus::seed_from_u64(derive_seed(seed, stream, round as u64));

                for r in 0..n_rows {
                    let p = sigmoid(margins[r]);
                    grad[r] = (p - y[r] as f64) as f32;
                    hess[r] = (p * (1.0 - p)).max(MIN_HESS) as f32;
                }

                let mut rows: Vec<u32> = if params.subsample < 1.0 {
                    (0..n_rows as u32)
                        .filter(|_| rng.r#gen::<f32>() < params.subsample)
                        .collect()
                } else {
                    (0..n_rows as u32).collect()
                };
                if rows.is_empty() {
                    rows = (0..n_rows as u32).collect();
                }

                let features = if n_cols < n_features {
                    let mut pool = all_features.clone();
                    let (chosen, _) = pool.partial_shuffle(&mut rng, n_cols);
                    let mut picked = chosen.to_vec();
                    picked.sort_unstable();
                    picked
                } else {
                    all_features.clone()
                };

                let tree = TreeGrower::new(binned, &grower_params)
                    .grow(rows, &grad, &hess, &features, &mut rng);

                let deltas =
                    parallelism.maybe_par_map(0..n_rows, |r| tree.predict_row(x.row(r)) as f64);
                for (m, d) in margins.iter_mut().zip(deltas) {
                    *m += d;
                }
                trees.push(tree);
            }

            tracing::trace!(rounds = trees.len(), base_score, "boosting finished");
            Self {
                base_score: base_score as f32,
                trees,
            }
        }
    }
}
