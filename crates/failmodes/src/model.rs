//! The trained model artifact.
//!
//! A [`TrainedModel`] bundles everything needed to go from a raw frame to
//! five probabilities: the fitted preprocessing, the per-label estimators and
//! the list of expected input columns. It is immutable once trained and is
//! persisted as a single JSON document.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::classifier::MultiLabelClassifier;
use crate::config::{ModelFamily, Profile, TrainConfig};
use crate::data::Frame;
use crate::ensemble::EnsembleParams;
use crate::error::{Error, Result};
use crate::preprocess::{FittedTransform, Preprocessor};
use crate::utils::Parallelism;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Training context stored next to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub format_version: u32,
    pub family: ModelFamily,
    pub profile: Profile,
    pub seed: u64,
    pub n_train_rows: usize,
    pub use_product_id: bool,
}

/// Preprocessing + five estimators + expected input columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    meta: ModelMeta,
    feature_names: Vec<String>,
    transform: FittedTransform,
    classifier: MultiLabelClassifier,
}

impl TrainedModel {
    /// Fit preprocessing and classifier on `frame` with labels `y`
    /// (`[n_rows, 5]`).
    pub fn fit(
        frame: &Frame,
        y: ArrayView2<u8>,
        config: &TrainConfig,
        parallelism: Parallelism,
    ) -> Result<Self> {
        let params = config.ensemble_params()?;
        let transform = Preprocessor::for_frame(frame, &config.feature_names()).fit(frame);
        let x = transform.transform(frame);
        let classifier = MultiLabelClassifier::fit(x.view(), y, &params, config.seed, parallelism)?;

        let family = match params {
            EnsembleParams::Forest(_) => ModelFamily::Forest,
            EnsembleParams::Gbdt(_) => ModelFamily::Gbdt,
        };
        Ok(Self {
            meta: ModelMeta {
                format_version: FORMAT_VERSION,
                family,
                profile: config.profile,
                seed: config.seed,
                n_train_rows: frame.n_rows(),
                use_product_id: config.use_product_id,
            },
            feature_names: transform.input_names(),
            transform,
            classifier,
        })
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// Input columns the model expects, in training order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn transform(&self) -> &FittedTransform {
        &self.transform
    }

    pub fn classifier(&self) -> &MultiLabelClassifier {
        &self.classifier
    }

    /// Probabilities `[n_rows, 5]` for a raw frame. Missing feature columns
    /// are imputed, extra columns are ignored.
    pub fn predict_proba(&self, frame: &Frame, parallelism: Parallelism) -> Array2<f32> {
        let x = self.transform.transform(frame);
        self.classifier.predict_probabilities(x.view(), parallelism)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: TrainedModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Write the model to `path` as JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        tracing::info!(path = %path.display(), "saved model");
        Ok(())
    }

    /// Read and validate a model written by [`save_json`](Self::save_json).
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let model: TrainedModel = serde_json::from_reader(BufReader::new(file))?;
        model.validate()?;
        tracing::debug!(path = %path.display(), family = %model.meta.family, "loaded model");
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.meta.format_version != FORMAT_VERSION {
            return Err(Error::UnsupportedFormat {
                found: self.meta.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if self.feature_names != self.transform.input_names() {
            return Err(Error::InvalidModel(
                "feature names disagree with the fitted transform".to_string(),
            ));
        }
        self.classifier
            .validate(self.transform.n_outputs())
            .map_err(|e| Error::InvalidModel(e.to_string()))
    }
}
