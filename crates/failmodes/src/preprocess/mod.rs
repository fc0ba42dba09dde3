//! Feature preprocessing.
//!
//! A [`Preprocessor`] is fitted once on training data and yields a
//! [`FittedTransform`] that turns any frame into a dense `f32` matrix of
//! fixed width:
//!
//! - numeric columns: missing values take the training median
//! - categorical columns: missing values take the training mode, then one
//!   indicator per category seen in training (unseen values encode to zeros)
//!
//! Output columns are all numeric columns in input order, followed by the
//! categorical indicators. Columns absent from the frame at transform time
//! are treated as entirely missing.

mod impute;
mod onehot;

pub use impute::{MedianImputer, MostFrequentImputer};
pub use onehot::OneHotEncoder;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::{Column, Frame};

/// How a feature column is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// A model input column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl FeatureColumn {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Unfitted preprocessing description.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    columns: Vec<FeatureColumn>,
}

impl Preprocessor {
    pub fn new(columns: Vec<FeatureColumn>) -> Self {
        Self { columns }
    }

    /// Take the kinds of `names` from `frame`: text columns are categorical,
    /// numeric and absent columns are numeric.
    pub fn for_frame<S: AsRef<str>>(frame: &Frame, names: &[S]) -> Self {
        let columns = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let kind = match frame.column(name) {
                    Some(Column::Text(_)) => ColumnKind::Categorical,
                    _ => ColumnKind::Numeric,
                };
                FeatureColumn::new(name, kind)
            })
            .collect();
        Self { columns }
    }

    /// Learn medians, modes and category vocabularies from `frame`.
    pub fn fit(&self, frame: &Frame) -> FittedTransform {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for feature in &self.columns {
            let column = frame.column(&feature.name);
            match feature.kind {
                ColumnKind::Numeric => numeric.push(MedianImputer::fit(&feature.name, column)),
                ColumnKind::Categorical => {
                    let imputer = MostFrequentImputer::fit(&feature.name, column);
                    let values = (0..frame.n_rows()).map(|row| imputer.value(column, row));
                    let encoder = OneHotEncoder::fit(&feature.name, values);
                    categorical.push(CategoricalFeature { imputer, encoder });
                }
            }
        }

        let transform = FittedTransform {
            inputs: self.columns.clone(),
            numeric,
            categorical,
        };
        tracing::debug!(
            inputs = transform.inputs.len(),
            outputs = transform.n_outputs(),
            "fitted preprocessing"
        );
        transform
    }
}

/// Imputer and encoder of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFeature {
    pub imputer: MostFrequentImputer,
    pub encoder: OneHotEncoder,
}

/// Preprocessing state learned from training data. Immutable after fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    inputs: Vec<FeatureColumn>,
    numeric: Vec<MedianImputer>,
    categorical: Vec<CategoricalFeature>,
}

impl FittedTransform {
    /// Input columns, in the order given at fit time.
    pub fn inputs(&self) -> &[FeatureColumn] {
        &self.inputs
    }

    /// Input column names.
    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|c| c.name.clone()).collect()
    }

    /// Output matrix width.
    pub fn n_outputs(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.encoder.width()).sum::<usize>()
    }

    /// Output column names.
    pub fn output_names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|n| n.column.clone())
            .chain(self.categorical.iter().flat_map(|c| c.encoder.feature_names()))
            .collect()
    }

    /// Encode `frame` as `[n_rows, n_outputs]`.
    pub fn transform(&self, frame: &Frame) -> Array2<f32> {
        let n_rows = frame.n_rows();
        let mut out = Array2::<f32>::zeros((n_rows, self.n_outputs()));

        for (j, imputer) in self.numeric.iter().enumerate() {
            let column = frame.column(&imputer.column);
            for (row, cell) in out.column_mut(j).iter_mut().enumerate() {
                *cell = imputer.value(column, row) as f32;
            }
        }

        let mut offset = self.numeric.len();
        for feature in &self.categorical {
            let column = frame.column(&feature.imputer.column);
            for row in 0..n_rows {
                let index = feature
                    .imputer
                    .value(column, row)
                    .and_then(|v| feature.encoder.index_of(&v));
                if let Some(i) = index {
                    out[[row, offset + i]] = 1.0;
                }
            }
            offset += feature.encoder.width();
        }

        out
    }
}
