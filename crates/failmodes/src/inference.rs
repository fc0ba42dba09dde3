//! Inference on raw observations.
//!
//! The engine never fails on messy input: absent feature columns are imputed
//! from training statistics and unknown categories encode to zeros. At
//! serving time a label is positive when its probability is strictly above
//! the threshold ([`Cutoff::Strict`]).

use ndarray::Array2;

use crate::calibrate::{Cutoff, Threshold, binarize};
use crate::data::{Column, Frame};
use crate::error::Result;
use crate::labels::{Label, LabelCodec, N_LABELS};
use crate::model::TrainedModel;
use crate::utils::Parallelism;

/// Decimal places kept in probability tables.
pub const PROBABILITY_DECIMALS: i32 = 6;

/// Round to [`PROBABILITY_DECIMALS`] places.
#[inline]
pub fn round_probability(p: f32) -> f64 {
    let scale = 10f64.powi(PROBABILITY_DECIMALS);
    (p as f64 * scale).round() / scale
}

/// Per-row probabilities and, when a threshold was given, decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    id_column: String,
    ids: Column,
    probabilities: Array2<f32>,
    threshold: Option<Threshold>,
    binary: Option<Array2<u8>>,
}

impl Predictions {
    pub fn n_rows(&self) -> usize {
        self.probabilities.nrows()
    }

    /// Identifier of each row.
    pub fn ids(&self) -> &Column {
        &self.ids
    }

    /// `[n_rows, 5]` in canonical label order.
    pub fn probabilities(&self) -> &Array2<f32> {
        &self.probabilities
    }

    pub fn threshold(&self) -> Option<Threshold> {
        self.threshold
    }

    /// `[n_rows, 5]` decisions, present when a threshold was supplied.
    pub fn binary(&self) -> Option<&Array2<u8>> {
        self.binary.as_ref()
    }

    /// Number of positive rows per label.
    pub fn positive_counts(&self) -> Option<[usize; N_LABELS]> {
        let binary = self.binary.as_ref()?;
        Some(Label::ALL.map(|l| binary.column(l.index()).iter().filter(|v| **v == 1).count()))
    }

    /// `id` followed by the five short-named probability columns, rounded.
    pub fn to_short_frame(&self) -> Result<Frame> {
        let mut columns = vec![(self.id_column.clone(), self.ids.clone())];
        for label in Label::ALL {
            let values = self
                .probabilities
                .column(label.index())
                .iter()
                .map(|&p| round_probability(p))
                .collect();
            columns.push((label.short_name().to_string(), Column::Numeric(values)));
        }
        Frame::from_columns(columns)
    }

    /// Same as [`to_short_frame`](Self::to_short_frame) with long label names.
    pub fn to_long_frame(&self, codec: &LabelCodec) -> Result<Frame> {
        let mut frame = self.to_short_frame()?;
        codec.to_long_names(&mut frame);
        Ok(frame)
    }

    /// `id` followed by the five 0/1 decision columns.
    pub fn to_binary_frame(&self) -> Result<Option<Frame>> {
        let Some(binary) = &self.binary else {
            return Ok(None);
        };
        let mut columns = vec![(self.id_column.clone(), self.ids.clone())];
        for label in Label::ALL {
            let values = binary.column(label.index()).iter().map(|&v| f64::from(v)).collect();
            columns.push((label.short_name().to_string(), Column::Numeric(values)));
        }
        Frame::from_columns(columns).map(Some)
    }
}

/// Runs a trained model over raw frames.
#[derive(Debug, Clone)]
pub struct InferenceEngine<'a> {
    model: &'a TrainedModel,
    id_column: String,
    parallelism: Parallelism,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(model: &'a TrainedModel) -> Self {
        Self {
            model,
            id_column: "id".to_string(),
            parallelism: Parallelism::Sequential,
        }
    }

    /// Name of the pass-through identifier column. Default: `id`.
    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Predict every row of `frame`.
    ///
    /// The identifier column is passed through and never used as a feature;
    /// when it is absent rows are numbered `1..=n`.
    pub fn predict(&self, threshold: Option<Threshold>, frame: &Frame) -> Result<Predictions> {
        let missing: Vec<&str> = self
            .model
            .feature_names()
            .iter()
            .map(String::as_str)
            .filter(|name| !frame.contains(name))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(?missing, "feature columns absent from input, imputing");
        }

        let n_rows = frame.n_rows();
        let ids = match frame.column(&self.id_column) {
            Some(column) => column.clone(),
            None => Column::Numeric((1..=n_rows).map(|i| i as f64).collect()),
        };

        let probabilities = self.model.predict_proba(frame, self.parallelism);
        let binary = threshold.map(|t| binarize(probabilities.view(), t, Cutoff::Strict));
        tracing::debug!(rows = n_rows, threshold = ?threshold.map(Threshold::value), "predicted");

        Ok(Predictions {
            id_column: self.id_column.clone(),
            ids,
            probabilities,
            threshold,
            binary,
        })
    }
}

/// Predict with default settings (`id` column, sequential).
pub fn predict(
    model: &TrainedModel,
    threshold: Option<Threshold>,
    frame: &Frame,
) -> Result<Predictions> {
    InferenceEngine::new(model).predict(threshold, frame)
}
