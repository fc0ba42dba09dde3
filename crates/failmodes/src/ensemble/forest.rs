//! Bagged random forest for one binary label.

use ndarray::ArrayView2;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::params::ForestParams;
use crate::tree::{
    BinnedMatrix, DEPTH_CAP, GainParams, GrowerParams, Tree, TreeGrower, TreeValidationError,
};
use crate::utils::{Parallelism, derive_seed};

/// Balanced class weights `n / (2 * n_class)` for `(negative, positive)`.
///
/// A class that never occurs gets weight 0.
pub fn balanced_weights(y: &[u8]) -> (f32, f32) {
    let n = y.len() as f64;
    let n_pos = y.iter().filter(|v| **v == 1).count() as f64;
    let n_neg = n - n_pos;
    let weight = |count: f64| if count > 0.0 { (n / (2.0 * count)) as f32 } else { 0.0 };
    (weight(n_neg), weight(n_pos))
}

/// A fitted forest; the probability is the mean of the trees' leaf
/// positive fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<Tree>,
}

impl RandomForest {
    /// Fit on binned features and a 0/1 target.
    ///
    /// Tree `t` draws all of its randomness from
    /// `derive_seed(seed, stream, t)`, so the forest does not depend on how
    /// trees are scheduled across threads.
    pub fn fit(
        binned: &BinnedMatrix,
        y: &[u8],
        params: &ForestParams,
        seed: u64,
        stream: u64,
        parallelism: Parallelism,
    ) -> Self {
        let n_rows = binned.n_rows();
        let n_features = binned.n_features();
        debug_assert_eq!(y.len(), n_rows);

        let (w_neg, w_pos) = if params.balanced { balanced_weights(y) } else { (1.0, 1.0) };
        let row_weight: Vec<f32> = y.iter().map(|&v| if v == 1 { w_pos } else { w_neg }).collect();

        let grower_params = GrowerParams {
            gain: GainParams::impurity(params.min_samples_leaf),
            max_depth: params.max_depth.unwrap_or(DEPTH_CAP).min(DEPTH_CAP),
            learning_rate: 1.0,
            features_per_node: Some(params.max_features.resolve(n_features)),
        };
        let features: Vec<u32> = (0..n_features as u32).collect();

        let trees = parallelism.maybe_par_map(0..params.n_trees, |t| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(derive_seed(seed, stream, t as u64));

            let mut counts = vec![0u32; n_rows];
            if params.bootstrap {
                for _ in 0..n_rows {
                    counts[rng.gen_range(0..n_rows)] += 1;
                }
            } else {
                counts.fill(1);
            }

            let mut grad = vec![0.0f32; n_rows];
            let mut hess = vec![0.0f32; n_rows];
            let mut rows = Vec::with_capacity(n_rows);
            for r in 0..n_rows {
                let w = row_weight[r] * counts[r] as f32;
                if w > 0.0 {
                    hess[r] = w;
                    grad[r] = -w * y[r] as f32;
                    rows.push(r as u32);
                }
            }

            if rows.is_empty() {
                return Tree::leaf(0.0);
            }
            TreeGrower::new(binned, &grower_params).grow(rows, &grad, &hess, &features, &mut rng)
        });

        Self { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Positive-class probability per row.
    pub fn predict(&self, x: ArrayView2<f32>, parallelism: Parallelism) -> Vec<f32> {
        let n_trees = self.trees.len().max(1) as f32;
        parallelism.maybe_par_map(0..x.nrows(), |r| {
            let row = x.row(r);
            let sum: f32 = self.trees.iter().map(|t| t.predict_row(row)).sum();
            (sum / n_trees).clamp(0.0, 1.0)
        })
    }

    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        if self.trees.is_empty() {
            return Err(TreeValidationError::Empty);
        }
        self.trees.iter().try_for_each(|t| t.validate(n_features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn toy() -> (Array2<f32>, Vec<u8>) {
        // positive iff x0 > 5, x1 is noise
        let n = 40;
        let x = Array2::from_shape_fn((n, 2), |(r, c)| {
            if c == 0 { r as f32 / 4.0 } else { ((r * 7) % 5) as f32 }
        });
        let y = (0..n).map(|r| u8::from(r as f32 / 4.0 > 5.0)).collect();
        (x, y)
    }

    #[test]
    fn balanced_weights_equalize_classes() {
        let (w_neg, w_pos) = balanced_weights(&[0, 0, 0, 1]);
        assert_relative_eq!(w_neg, 4.0 / 6.0);
        assert_relative_eq!(w_pos, 2.0);
        assert_eq!(balanced_weights(&[0, 0]).1, 0.0);
    }

    #[test]
    fn forest_separates_threshold_concept() {
        let (x, y) = toy();
        let binned = BinnedMatrix::from_matrix(x.view(), 255);
        let params = ForestParams {
            n_trees: 25,
            min_samples_leaf: 1,
            ..Default::default()
        };
        let forest = RandomForest::fit(&binned, &y, &params, 42, 0, Parallelism::Sequential);
        assert_eq!(forest.n_trees(), 25);
        assert!(forest.validate(2).is_ok());

        let proba = forest.predict(x.view(), Parallelism::Sequential);
        for (p, &label) in proba.iter().zip(&y) {
            assert!((0.0..=1.0).contains(p));
            if label == 1 {
                assert!(*p > 0.5, "positive row scored {p}");
            }
        }
        assert!(proba[0] < 0.5);
    }

    #[test]
    fn forest_is_thread_count_independent() {
        let (x, y) = toy();
        let binned = BinnedMatrix::from_matrix(x.view(), 255);
        let params = ForestParams {
            n_trees: 10,
            ..Default::default()
        };
        let seq = RandomForest::fit(&binned, &y, &params, 7, 3, Parallelism::Sequential);
        let par =
            crate::utils::run_with_threads(4, |p| RandomForest::fit(&binned, &y, &params, 7, 3, p));
        assert_eq!(seq, par);
    }
}
