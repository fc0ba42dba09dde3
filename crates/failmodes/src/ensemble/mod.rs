//! Tree ensembles for binary labels.
//!
//! - [`RandomForest`]: bagged, class-balanced trees (default family)
//! - [`GradientBoosted`]: logistic-loss boosting (training needs `gbdt`)
//! - [`BinaryEstimator`]: what a single label slot holds

mod boosted;
mod estimator;
mod forest;
mod params;

pub use boosted::GradientBoosted;
pub use estimator::BinaryEstimator;
pub use forest::{RandomForest, balanced_weights};
pub use params::{BoostParams, EnsembleParams, ForestParams, MaxFeatures};
