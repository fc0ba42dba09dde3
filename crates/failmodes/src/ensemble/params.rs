//! Hyperparameter groups for the two ensemble families.
//!
//! - [`ForestParams`]: bagged, class-balanced impurity trees
//! - [`BoostParams`]: gradient boosting with logistic loss
//!
//! Both validate into [`ConfigError`]; presets per profile live in
//! [`crate::config`].

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::tree::MAX_BINS;

// =============================================================================
// MaxFeatures
// =============================================================================

/// Number of features drawn as split candidates at each node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(d))`, at least 1.
    #[default]
    Sqrt,
    /// Every feature.
    All,
    /// A fixed count (capped at `d`).
    Count(usize),
}

impl MaxFeatures {
    /// Resolve against `n_features`.
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

// =============================================================================
// ForestParams
// =============================================================================

/// Random forest parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees. Default: 150.
    pub n_trees: u32,
    /// Depth limit; `None` grows until leaves are pure (bounded by
    /// [`crate::tree::DEPTH_CAP`]).
    pub max_depth: Option<u32>,
    /// Minimum samples per leaf. Default: 5.
    pub min_samples_leaf: u32,
    /// Split candidates per node. Default: `Sqrt`.
    pub max_features: MaxFeatures,
    /// Draw a bootstrap sample per tree. Default: true.
    pub bootstrap: bool,
    /// Weight classes by `n / (2 * n_class)`. Default: true.
    pub balanced: bool,
    /// Histogram bins per feature. Default: 255.
    pub max_bins: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 150,
            max_depth: None,
            min_samples_leaf: 5,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            balanced: true,
            max_bins: MAX_BINS,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees == 0 {
            return Err(ConfigError::InvalidNTrees);
        }
        if self.min_samples_leaf == 0 {
            return Err(ConfigError::InvalidMinSamplesLeaf);
        }
        if self.max_depth == Some(0) {
            return Err(ConfigError::InvalidMaxDepth);
        }
        if self.max_bins < 2 {
            return Err(ConfigError::InvalidMaxBins(self.max_bins));
        }
        Ok(())
    }
}

// =============================================================================
// BoostParams
// =============================================================================

/// Gradient boosting parameters (logistic loss).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    /// Boosting rounds. Default: 250.
    pub n_trees: u32,
    /// Depth limit. Default: 4.
    pub max_depth: u32,
    /// Shrinkage. Default: 0.05.
    pub learning_rate: f32,
    /// Row sampling ratio per round, in (0, 1]. Default: 0.8.
    pub subsample: f32,
    /// Feature sampling ratio per tree, in (0, 1]. Default: 0.8.
    pub colsample_bytree: f32,
    /// L2 regularization on leaf weights. Default: 1.0.
    pub reg_lambda: f32,
    /// Minimum hessian sum per child. Default: 1.0.
    pub min_child_weight: f32,
    /// Histogram bins per feature. Default: 255.
    pub max_bins: usize,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_trees: 250,
            max_depth: 4,
            learning_rate: 0.05,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            max_bins: MAX_BINS,
        }
    }
}

impl BoostParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees == 0 {
            return Err(ConfigError::InvalidNTrees);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth);
        }
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        for (field, value) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::InvalidSamplingRatio { field, value });
            }
        }
        for (field, value) in [
            ("reg_lambda", self.reg_lambda),
            ("min_child_weight", self.min_child_weight),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::InvalidRegularization { field, value });
            }
        }
        if self.max_bins < 2 {
            return Err(ConfigError::InvalidMaxBins(self.max_bins));
        }
        Ok(())
    }
}

// =============================================================================
// EnsembleParams
// =============================================================================

/// Parameters of one model family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum EnsembleParams {
    Forest(ForestParams),
    Gbdt(BoostParams),
}

impl EnsembleParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            EnsembleParams::Forest(p) => p.validate(),
            EnsembleParams::Gbdt(p) => p.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MaxFeatures::Sqrt, 7, 2)]
    #[case(MaxFeatures::Sqrt, 1, 1)]
    #[case(MaxFeatures::Sqrt, 10, 3)]
    #[case(MaxFeatures::All, 10, 10)]
    #[case(MaxFeatures::Count(50), 10, 10)]
    #[case(MaxFeatures::Count(0), 10, 1)]
    fn max_features_resolution(#[case] mf: MaxFeatures, #[case] d: usize, #[case] expected: usize) {
        assert_eq!(mf.resolve(d), expected);
    }

    #[test]
    fn defaults_are_valid() {
        assert!(ForestParams::default().validate().is_ok());
        assert!(BoostParams::default().validate().is_ok());
    }

    #[test]
    fn invalid_boost_params_are_rejected() {
        let p = BoostParams {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(ConfigError::InvalidLearningRate(_))));

        let p = BoostParams {
            subsample: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ConfigError::InvalidSamplingRatio { field: "subsample", .. })
        ));

        let p = ForestParams {
            n_trees: 0,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(ConfigError::InvalidNTrees)));
    }
}
