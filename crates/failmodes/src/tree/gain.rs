//! Gain computation and regularization parameters.

use serde::{Deserialize, Serialize};

/// Parameters for split gain computation and leaf weight calculation.
///
/// Static for the lifetime of training. With `reg_lambda = 0` and
/// `grad = -w*y, hess = w` the gain is the weighted variance reduction,
/// which for 0/1 targets is proportional to the Gini decrease.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GainParams {
    /// L2 regularization (lambda).
    pub reg_lambda: f32,
    /// Minimum split gain (gamma).
    pub min_gain: f32,
    /// Minimum sum of hessians per child.
    pub min_child_weight: f32,
    /// Minimum samples per child.
    pub min_samples_leaf: u32,
}

impl Default for GainParams {
    fn default() -> Self {
        Self {
            reg_lambda: 1.0,
            min_gain: 0.0,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
        }
    }
}

impl GainParams {
    /// Gain parameters for impurity-style trees (random forests).
    pub fn impurity(min_samples_leaf: u32) -> Self {
        Self {
            reg_lambda: 0.0,
            min_gain: 0.0,
            min_child_weight: 0.0,
            min_samples_leaf: min_samples_leaf.max(1),
        }
    }

    /// Structure score of a node: `G² / (H + λ)`.
    #[inline]
    fn score(&self, grad: f64, hess: f64) -> f64 {
        let denom = hess + self.reg_lambda as f64;
        if denom <= 0.0 { 0.0 } else { grad * grad / denom }
    }

    /// Split gain.
    ///
    /// ```text
    /// gain = 0.5 * [G_L²/(H_L + λ) + G_R²/(H_R + λ) - G_P²/(H_P + λ)] - γ
    /// ```
    #[inline]
    pub fn compute_gain(
        &self,
        grad_left: f64,
        hess_left: f64,
        grad_right: f64,
        hess_right: f64,
        grad_parent: f64,
        hess_parent: f64,
    ) -> f64 {
        0.5 * (self.score(grad_left, hess_left) + self.score(grad_right, hess_right)
            - self.score(grad_parent, hess_parent))
            - self.min_gain as f64
    }

    /// Check if a split satisfies minimum constraints.
    #[inline]
    pub fn is_valid_split(
        &self,
        hess_left: f64,
        hess_right: f64,
        count_left: u32,
        count_right: u32,
    ) -> bool {
        let min_weight = self.min_child_weight as f64;
        count_left >= self.min_samples_leaf
            && count_right >= self.min_samples_leaf
            && hess_left > 0.0
            && hess_right > 0.0
            && hess_left >= min_weight
            && hess_right >= min_weight
    }

    /// Newton leaf weight `-G / (H + λ)`.
    #[inline]
    pub fn leaf_weight(&self, grad: f64, hess: f64) -> f64 {
        let denom = hess + self.reg_lambda as f64;
        if denom <= 0.0 { 0.0 } else { -grad / denom }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn impurity_leaf_weight_is_positive_fraction() {
        let params = GainParams::impurity(1);
        // 3 rows, 1 positive, unit weights: G = -1, H = 3
        assert_relative_eq!(params.leaf_weight(-1.0, 3.0), 1.0 / 3.0);
    }

    #[test]
    fn perfect_split_has_positive_gain() {
        let params = GainParams::impurity(1);
        // left: two negatives, right: two positives
        let gain = params.compute_gain(0.0, 2.0, -2.0, 2.0, -2.0, 4.0);
        assert!(gain > 0.0);
        // useless split: same mix on both sides
        let gain = params.compute_gain(-1.0, 2.0, -1.0, 2.0, -2.0, 4.0);
        assert_relative_eq!(gain, 0.0);
    }

    #[test]
    fn min_samples_leaf_is_enforced() {
        let params = GainParams::impurity(5);
        assert!(!params.is_valid_split(4.0, 10.0, 4, 10));
        assert!(params.is_valid_split(5.0, 10.0, 5, 10));
    }
}
