//! Read-only prediction session backing an interactive dashboard.
//!
//! A session holds the trained model and the serving threshold. Uploaded CSV
//! bytes go in, downloadable CSV bytes and per-label positive counts come
//! out. Nothing is written to the results directory.

use std::fs;

use crate::artifacts::{ArtifactPaths, load_threshold_or_default};
use crate::calibrate::Threshold;
use crate::data::Frame;
use crate::error::{Error, Result};
use crate::inference::{InferenceEngine, Predictions};
use crate::labels::{LabelCodec, N_LABELS};
use crate::model::TrainedModel;
use crate::utils::Parallelism;

/// Result of scoring one upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub predictions: Predictions,
    /// `id` + short label columns.
    pub short_csv: Vec<u8>,
    /// `id` + long label columns.
    pub long_csv: Vec<u8>,
    /// `id` + 0/1 decisions at the applied threshold.
    pub binary_csv: Vec<u8>,
    /// Rows above the threshold, per label.
    pub positive_counts: [usize; N_LABELS],
}

#[derive(Debug, Clone)]
pub struct DashboardSession {
    model: TrainedModel,
    threshold: Threshold,
    codec: LabelCodec,
    paths: ArtifactPaths,
}

impl DashboardSession {
    /// Open the artifacts under `paths`.
    ///
    /// # Errors
    ///
    /// The model is required; a missing or unparseable threshold falls back
    /// to [`Threshold::DEFAULT`] with a warning.
    pub fn open(paths: ArtifactPaths) -> Result<Self> {
        let model = TrainedModel::load_json(paths.model())?;
        let threshold = load_threshold_or_default(paths.threshold());
        tracing::info!(
            threshold = %threshold,
            features = ?model.feature_names(),
            "dashboard session ready"
        );
        Ok(Self {
            model,
            threshold,
            codec: LabelCodec::default(),
            paths,
        })
    }

    /// Session over an in-memory model; panels still read from `paths`.
    pub fn from_parts(model: TrainedModel, threshold: Threshold, paths: ArtifactPaths) -> Self {
        Self {
            model,
            threshold,
            codec: LabelCodec::default(),
            paths,
        }
    }

    pub fn with_codec(mut self, codec: LabelCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Threshold loaded at open time.
    pub fn default_threshold(&self) -> Threshold {
        self.threshold
    }

    /// Input columns an upload should carry.
    pub fn expected_columns(&self) -> &[String] {
        self.model.feature_names()
    }

    /// Score an uploaded CSV. `threshold` overrides the session threshold.
    pub fn predict_csv(&self, bytes: &[u8], threshold: Option<Threshold>) -> Result<UploadResult> {
        let frame = Frame::from_csv_reader(bytes)?;
        self.predict_frame(&frame, threshold)
    }

    pub fn predict_frame(
        &self,
        frame: &Frame,
        threshold: Option<Threshold>,
    ) -> Result<UploadResult> {
        let threshold = threshold.unwrap_or(self.threshold);
        let predictions = InferenceEngine::new(&self.model)
            .with_parallelism(Parallelism::from_threads(0))
            .predict(Some(threshold), frame)?;

        let positive_counts = predictions.positive_counts().unwrap_or([0; N_LABELS]);
        tracing::info!(
            rows = predictions.n_rows(),
            threshold = %threshold,
            ?positive_counts,
            "scored upload"
        );

        let binary_csv = match predictions.to_binary_frame()? {
            Some(frame) => frame.to_csv_bytes()?,
            None => Vec::new(),
        };

        Ok(UploadResult {
            short_csv: predictions.to_short_frame()?.to_csv_bytes()?,
            long_csv: predictions.to_long_frame(&self.codec)?.to_csv_bytes()?,
            binary_csv,
            positive_counts,
            predictions,
        })
    }

    // =========================================================================
    // Optional panels
    // =========================================================================

    /// The numeric summary table, if one was written.
    pub fn numeric_summary(&self) -> Option<Frame> {
        let path = self.paths.numeric_summary();
        if !path.exists() {
            return None;
        }
        Frame::read_csv(&path)
            .inspect_err(|err| {
                tracing::warn!(path = %path.display(), %err, "unreadable numeric summary")
            })
            .ok()
    }

    /// The last remote metrics payload, if one was saved.
    pub fn last_api_metrics(&self) -> Option<serde_json::Value> {
        let path = self.paths.api_metrics();
        let text = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&text)
            .map_err(Error::from)
            .inspect_err(|err| {
                tracing::warn!(path = %path.display(), %err, "unreadable metrics file")
            })
            .ok()
    }
}
