//! Training configuration and dataset schema.
//!
//! [`TrainConfig`] is built with `bon` and validated at `build()`.
//! [`SchemaConfig`] names the dataset columns; its defaults match the
//! machine-failure dataset and it can be loaded from a TOML file.
//!
//! # Example
//!
//! ```
//! use failmodes::config::{ModelFamily, Profile, TrainConfig};
//!
//! let config = TrainConfig::builder()
//!     .family(ModelFamily::Forest)
//!     .profile(Profile::Fast)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.valid_fraction, 0.2);
//! ```

use std::fmt;
use std::path::Path;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::ensemble::{BoostParams, EnsembleParams, ForestParams};
use crate::error::{Error, Result};
use crate::labels::LabelCodec;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Learning rate must be positive.
    InvalidLearningRate(f32),
    /// Number of trees must be at least 1.
    InvalidNTrees,
    /// Invalid sampling ratio (must be in (0, 1]).
    InvalidSamplingRatio { field: &'static str, value: f32 },
    /// Invalid regularization parameter.
    InvalidRegularization { field: &'static str, value: f32 },
    /// `min_samples_leaf` must be at least 1.
    InvalidMinSamplesLeaf,
    /// Depth limit must be at least 1.
    InvalidMaxDepth,
    /// At least two histogram bins are needed.
    InvalidMaxBins(usize),
    /// Validation fraction must be in (0, 1).
    InvalidValidFraction(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLearningRate(v) => write!(f, "learning_rate must be positive, got {v}"),
            Self::InvalidNTrees => write!(f, "n_trees must be at least 1"),
            Self::InvalidSamplingRatio { field, value } => {
                write!(f, "{field} must be in (0, 1], got {value}")
            }
            Self::InvalidRegularization { field, value } => {
                write!(f, "{field} must be non-negative, got {value}")
            }
            Self::InvalidMinSamplesLeaf => write!(f, "min_samples_leaf must be at least 1"),
            Self::InvalidMaxDepth => write!(f, "max_depth must be at least 1"),
            Self::InvalidMaxBins(v) => write!(f, "max_bins must be at least 2, got {v}"),
            Self::InvalidValidFraction(v) => write!(f, "valid_fraction must be in (0, 1), got {v}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// Model family & profile
// =============================================================================

/// Which ensemble backs each label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Bagged, class-balanced random forest.
    #[default]
    Forest,
    /// Gradient-boosted trees (needs the `gbdt` feature to train).
    Gbdt,
}

/// Hyperparameter preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Fewer trees, quicker runs.
    #[default]
    Fast,
    /// More trees, slower and usually slightly better.
    Full,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelFamily::Forest => "forest",
            ModelFamily::Gbdt => "gbdt",
        })
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Profile::Fast => "fast",
            Profile::Full => "full",
        })
    }
}

impl ModelFamily {
    /// Whether this family can be trained in the current build.
    pub const fn is_available(self) -> bool {
        match self {
            ModelFamily::Forest => true,
            ModelFamily::Gbdt => cfg!(feature = "gbdt"),
        }
    }

    /// Fail with [`Error::FamilyUnavailable`] if this family cannot be trained.
    pub fn ensure_available(self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::FamilyUnavailable("gbdt"))
        }
    }

    /// Preset parameters for `profile`.
    pub fn params(self, profile: Profile) -> Result<EnsembleParams> {
        self.ensure_available()?;
        let params = match (self, profile) {
            (ModelFamily::Forest, Profile::Fast) => EnsembleParams::Forest(ForestParams {
                n_trees: 150,
                min_samples_leaf: 5,
                ..Default::default()
            }),
            (ModelFamily::Forest, Profile::Full) => EnsembleParams::Forest(ForestParams {
                n_trees: 400,
                min_samples_leaf: 1,
                ..Default::default()
            }),
            (ModelFamily::Gbdt, Profile::Fast) => EnsembleParams::Gbdt(BoostParams::default()),
            (ModelFamily::Gbdt, Profile::Full) => EnsembleParams::Gbdt(BoostParams {
                n_trees: 500,
                max_depth: 6,
                learning_rate: 0.03,
                subsample: 0.9,
                colsample_bytree: 0.9,
                ..Default::default()
            }),
        };
        Ok(params)
    }
}

// =============================================================================
// SchemaConfig
// =============================================================================

/// Column names of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Row identifier, passed through to predictions.
    pub id_column: String,
    /// High-cardinality product identifier, used as a feature on request.
    pub product_id_column: String,
    /// Categorical machine type.
    pub type_column: String,
    /// Continuous sensor readings.
    pub numeric_columns: Vec<String>,
    /// Aggregate "any failure" column, recomputed from the labels.
    pub machine_failure_column: String,
    /// Long label names.
    pub labels: LabelCodec,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            id_column: "id".to_string(),
            product_id_column: "id_produto".to_string(),
            type_column: "tipo".to_string(),
            numeric_columns: [
                "temperatura_ar",
                "temperatura_processo",
                "umidade_relativa",
                "velocidade_rotacional",
                "torque",
                "desgaste_da_ferramenta",
            ]
            .map(String::from)
            .to_vec(),
            machine_failure_column: "falha_maquina".to_string(),
            labels: LabelCodec::default(),
        }
    }
}

impl SchemaConfig {
    /// Load from a TOML file; absent keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&text).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Model input columns: the type column and the sensor readings,
    /// preceded by the product id when `use_product_id` is set. How each is
    /// encoded is decided from the training data.
    pub fn feature_names(&self, use_product_id: bool) -> Vec<String> {
        let mut names = Vec::with_capacity(self.numeric_columns.len() + 2);
        if use_product_id {
            names.push(self.product_id_column.clone());
        }
        names.push(self.type_column.clone());
        names.extend(self.numeric_columns.iter().cloned());
        names
    }
}

// =============================================================================
// TrainConfig
// =============================================================================

/// Configuration of a training run.
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct TrainConfig {
    /// Model family. Default: forest.
    #[builder(default)]
    pub family: ModelFamily,

    /// Hyperparameter preset. Default: fast.
    #[builder(default)]
    pub profile: Profile,

    /// Explicit ensemble parameters, replacing the family/profile preset.
    pub ensemble: Option<EnsembleParams>,

    /// Use the product id as a categorical feature. Default: false.
    #[builder(default)]
    pub use_product_id: bool,

    /// Share of rows held out for threshold calibration. Default: 0.2.
    #[builder(default = 0.2)]
    pub valid_fraction: f64,

    /// Random seed for the split and every tree. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Worker threads; 0 = auto. Default: 0.
    #[builder(default)]
    pub n_threads: usize,

    /// Dataset column names.
    #[builder(default)]
    pub schema: SchemaConfig,
}

impl<S: train_config_builder::IsComplete> TrainConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `valid_fraction` is outside (0, 1) or the
    /// explicit ensemble parameters are invalid.
    pub fn build(self) -> std::result::Result<TrainConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl TrainConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.valid_fraction > 0.0 && self.valid_fraction < 1.0) {
            return Err(ConfigError::InvalidValidFraction(self.valid_fraction));
        }
        if let Some(params) = &self.ensemble {
            params.validate()?;
        }
        Ok(())
    }

    /// Ensemble parameters for this run.
    ///
    /// # Errors
    ///
    /// [`Error::FamilyUnavailable`] when the chosen family is not compiled in.
    pub fn ensemble_params(&self) -> Result<EnsembleParams> {
        match &self.ensemble {
            Some(params @ EnsembleParams::Forest(_)) => Ok(params.clone()),
            Some(params @ EnsembleParams::Gbdt(_)) => {
                ModelFamily::Gbdt.ensure_available()?;
                Ok(params.clone())
            }
            None => self.family.params(self.profile),
        }
    }

    /// Model input columns for this run.
    pub fn feature_names(&self) -> Vec<String> {
        self.schema.feature_names(self.use_product_id)
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::builder().__build_internal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Label;

    #[test]
    fn default_config() {
        let config = TrainConfig::builder().build().unwrap();
        assert_eq!(config.family, ModelFamily::Forest);
        assert_eq!(config.profile, Profile::Fast);
        assert_eq!(config.seed, 42);
        assert_eq!(config.valid_fraction, 0.2);
        match config.ensemble_params().unwrap() {
            EnsembleParams::Forest(p) => {
                assert_eq!(p.n_trees, 150);
                assert_eq!(p.min_samples_leaf, 5);
            }
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn invalid_valid_fraction() {
        for v in [0.0, 1.0, -0.1, f64::NAN] {
            let result = TrainConfig::builder().valid_fraction(v).build();
            assert!(matches!(result, Err(ConfigError::InvalidValidFraction(_))));
        }
    }

    #[test]
    fn invalid_override_is_rejected() {
        let result = TrainConfig::builder()
            .ensemble(EnsembleParams::Forest(ForestParams {
                n_trees: 0,
                ..Default::default()
            }))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidNTrees)));
    }

    #[test]
    fn full_profile_presets() {
        match ModelFamily::Forest.params(Profile::Full).unwrap() {
            EnsembleParams::Forest(p) => assert_eq!((p.n_trees, p.min_samples_leaf), (400, 1)),
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[cfg(feature = "gbdt")]
    #[test]
    fn gbdt_presets() {
        match ModelFamily::Gbdt.params(Profile::Full).unwrap() {
            EnsembleParams::Gbdt(p) => {
                assert_eq!(p.n_trees, 500);
                assert_eq!(p.max_depth, 6);
            }
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[cfg(not(feature = "gbdt"))]
    #[test]
    fn gbdt_unavailable_without_feature() {
        assert!(matches!(
            ModelFamily::Gbdt.params(Profile::Fast),
            Err(Error::FamilyUnavailable("gbdt"))
        ));
    }

    #[test]
    fn schema_feature_columns() {
        let schema = SchemaConfig::default();
        let names = schema.feature_names(false);
        assert_eq!(names.len(), 7);
        assert_eq!(names[0], "tipo");
        let with_id = schema.feature_names(true);
        assert_eq!(with_id[0], "id_produto");
        assert_eq!(with_id.len(), 8);
    }

    #[test]
    fn schema_from_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.toml");
        std::fs::write(
            &path,
            "type_column = \"kind\"\n\n[labels]\nFA = \"Random failure\"\n",
        )
        .unwrap();

        let schema = SchemaConfig::from_toml_file(&path).unwrap();
        assert_eq!(schema.type_column, "kind");
        assert_eq!(schema.id_column, "id");
        assert_eq!(schema.labels.long_name(Label::Fa), "Random failure");
        assert_eq!(schema.numeric_columns.len(), 6);
    }

    #[test]
    fn schema_toml_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "numeric_columns = 3\n").unwrap();
        assert!(matches!(
            SchemaConfig::from_toml_file(&path),
            Err(Error::ConfigFile { .. })
        ));
    }
}
