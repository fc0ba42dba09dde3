//! Multi-label classifier: one independent binary estimator per label.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::ensemble::{BinaryEstimator, EnsembleParams};
use crate::error::{Error, Result};
use crate::labels::{Label, N_LABELS};
use crate::tree::{BinnedMatrix, TreeValidationError};
use crate::utils::Parallelism;

/// Five binary estimators in canonical label order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLabelClassifier {
    estimators: [BinaryEstimator; N_LABELS],
}

impl MultiLabelClassifier {
    /// Fit every label against its own column of `y` (`[n_rows, 5]`, 0/1).
    ///
    /// Label `l` uses RNG stream `l`, so estimators never share randomness.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if `x` and `y` disagree on rows or `y` is
    ///   not five columns wide
    /// - [`Error::EmptyDataset`] for zero rows
    /// - [`Error::FamilyUnavailable`] if boosting is requested but not built
    pub fn fit(
        x: ArrayView2<f32>,
        y: ArrayView2<u8>,
        params: &EnsembleParams,
        seed: u64,
        parallelism: Parallelism,
    ) -> Result<Self> {
        if y.dim() != (x.nrows(), N_LABELS) {
            return Err(Error::ShapeMismatch {
                context: "label matrix",
                expected: (x.nrows(), N_LABELS),
                got: y.dim(),
            });
        }
        if x.nrows() == 0 {
            return Err(Error::EmptyDataset);
        }
        if let EnsembleParams::Gbdt(_) = params {
            crate::config::ModelFamily::Gbdt.ensure_available()?;
        }

        let max_bins = match params {
            EnsembleParams::Forest(p) => p.max_bins,
            EnsembleParams::Gbdt(p) => p.max_bins,
        };
        let binned = BinnedMatrix::from_matrix(x, max_bins);

        let fitted = parallelism.maybe_par_map(Label::ALL.to_vec(), |label| {
            let target: Vec<u8> = y.column(label.index()).to_vec();
            let positives = target.iter().filter(|v| **v == 1).count();
            let estimator = BinaryEstimator::fit(
                x,
                &binned,
                &target,
                params,
                seed,
                label.index() as u64,
                parallelism,
            );
            tracing::debug!(%label, positives, rows = target.len(), "fitted label");
            estimator
        });

        let mut estimators = Vec::with_capacity(N_LABELS);
        for (label, estimator) in Label::ALL.into_iter().zip(fitted) {
            let estimator = estimator?;
            if estimator.is_constant() {
                tracing::warn!(%label, "single class in training data, using a constant estimator");
            }
            estimators.push(estimator);
        }

        let estimators: [BinaryEstimator; N_LABELS] = estimators
            .try_into()
            .map_err(|_| Error::EmptyDataset)?;
        Ok(Self { estimators })
    }

    pub fn estimator(&self, label: Label) -> &BinaryEstimator {
        &self.estimators[label.index()]
    }

    /// Positive-class probabilities, `[n_rows, 5]` in canonical label order.
    pub fn predict_probabilities(
        &self,
        x: ArrayView2<f32>,
        parallelism: Parallelism,
    ) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((x.nrows(), N_LABELS));
        for label in Label::ALL {
            let proba = self.estimator(label).predict(x, parallelism);
            for (cell, p) in out.column_mut(label.index()).iter_mut().zip(proba) {
                *cell = p;
            }
        }
        out
    }

    pub fn validate(&self, n_features: usize) -> std::result::Result<(), TreeValidationError> {
        self.estimators.iter().try_for_each(|e| e.validate(n_features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::ForestParams;
    use ndarray::Array2;

    fn data() -> (Array2<f32>, Array2<u8>) {
        let n = 30;
        let x = Array2::from_shape_fn((n, 3), |(r, c)| (r * (c + 1)) as f32);
        let y = Array2::from_shape_fn((n, N_LABELS), |(r, l)| match l {
            0 => u8::from(r >= 20),
            1 => u8::from(r < 5),
            4 => 0,
            _ => u8::from(r % 2 == 0),
        });
        (x, y)
    }

    fn params() -> EnsembleParams {
        EnsembleParams::Forest(ForestParams {
            n_trees: 10,
            min_samples_leaf: 1,
            ..Default::default()
        })
    }

    #[test]
    fn fits_five_labels_and_predicts_in_range() {
        let (x, y) = data();
        let model =
            MultiLabelClassifier::fit(x.view(), y.view(), &params(), 42, Parallelism::Sequential)
                .unwrap();
        assert_eq!(model.estimator(Label::Fa), &BinaryEstimator::Constant { probability: 0.0 });

        let proba = model.predict_probabilities(x.view(), Parallelism::Sequential);
        assert_eq!(proba.dim(), (30, N_LABELS));
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(proba.column(Label::Fa.index()).iter().all(|p| *p == 0.0));
        assert!(proba[[29, 0]] > proba[[0, 0]]);
    }

    #[test]
    fn wrong_label_shape_is_rejected() {
        let (x, _) = data();
        let y = Array2::<u8>::zeros((30, 4));
        let err =
            MultiLabelClassifier::fit(x.view(), y.view(), &params(), 42, Parallelism::Sequential)
                .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let (x, y) = data();
        let seq =
            MultiLabelClassifier::fit(x.view(), y.view(), &params(), 9, Parallelism::Sequential)
                .unwrap();
        let par = crate::utils::run_with_threads(3, |p| {
            MultiLabelClassifier::fit(x.view(), y.view(), &params(), 9, p).unwrap()
        });
        assert_eq!(seq, par);
    }
}
