//! End-to-end training run.
//!
//! Reads the training table, cleans it, holds out a validation split to pick
//! the decision threshold, refits on every row and writes the artifacts. When
//! a test table is given, its probabilities are written as submissions.

use std::path::Path;

use ndarray::Array2;

use crate::artifacts::{ArtifactPaths, save_threshold, write_text};
use crate::calibrate::{Calibration, Cutoff, binarize, select_threshold};
use crate::config::{SchemaConfig, TrainConfig};
use crate::data::{Column, Frame, repair_negatives, split_indices};
use crate::error::{Error, Result};
use crate::inference::{InferenceEngine, Predictions};
use crate::labels::{Label, N_LABELS, normalize_label, normalize_labels};
use crate::metrics::ClassificationReport;
use crate::model::TrainedModel;
use crate::utils::{Parallelism, run_with_threads};

/// Everything a training run produced.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Model refit on all training rows.
    pub model: TrainedModel,
    /// Threshold chosen on the validation split.
    pub calibration: Calibration,
    /// Validation report at the chosen threshold (`>=`).
    pub report: ClassificationReport,
    /// Training rows after duplicate removal.
    pub n_rows: usize,
    /// Test-set predictions, when a test table was given.
    pub test_predictions: Option<Predictions>,
}

// =============================================================================
// Data preparation
// =============================================================================

/// Clean a raw training table.
///
/// Long label names are shortened, duplicate ids dropped (first kept), labels
/// coerced to 0/1, the machine failure flag recomputed from the labels and
/// negative sensor readings replaced by column medians.
///
/// # Errors
///
/// [`Error::MissingColumns`] if any of the five labels is absent.
pub fn prepare_training_frame(mut frame: Frame, schema: &SchemaConfig) -> Result<Frame> {
    schema.labels.to_short_names(&mut frame);
    frame.require_columns("train", &Label::short_names())?;

    let before = frame.n_rows();
    let mut frame = frame.drop_duplicates(&schema.id_column);
    if frame.n_rows() < before {
        tracing::info!(dropped = before - frame.n_rows(), "dropped duplicate ids");
    }

    normalize_labels(&mut frame);
    if frame.contains(&schema.machine_failure_column) {
        let y = label_matrix(&frame)?;
        let any = y
            .rows()
            .into_iter()
            .map(|row| f64::from(u8::from(row.iter().any(|&v| v == 1))))
            .collect();
        frame.set_column(schema.machine_failure_column.clone(), Column::Numeric(any))?;
    }

    repair_negatives(&mut frame, &Label::short_names());
    Ok(frame)
}

/// The five label columns as a `[n_rows, 5]` 0/1 matrix.
///
/// # Errors
///
/// [`Error::MissingColumns`] if a label column is absent.
pub fn label_matrix(frame: &Frame) -> Result<Array2<u8>> {
    frame.require_columns("labels", &Label::short_names())?;
    let mut y = Array2::zeros((frame.n_rows(), N_LABELS));
    for label in Label::ALL {
        if let Some(column) = frame.column(label.short_name()) {
            for (row, value) in normalize_label(column).into_iter().enumerate() {
                y[[row, label.index()]] = value;
            }
        }
    }
    Ok(y)
}

// =============================================================================
// Training
// =============================================================================

/// Result of fitting on the training split and scoring the validation split.
#[derive(Debug, Clone)]
pub struct Validation {
    pub calibration: Calibration,
    pub report: ClassificationReport,
}

/// Fit on a shuffled training split, calibrate the threshold on the held-out
/// rows and build the report at that threshold.
pub fn validate(
    frame: &Frame,
    y: &Array2<u8>,
    config: &TrainConfig,
    parallelism: Parallelism,
) -> Result<Validation> {
    let (train_idx, valid_idx) = split_indices(frame.n_rows(), config.valid_fraction, config.seed);
    tracing::info!(train = train_idx.len(), valid = valid_idx.len(), "split rows");
    if train_idx.is_empty() || valid_idx.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let train = frame.take_rows(&train_idx);
    let y_train = y.select(ndarray::Axis(0), &train_idx);
    let valid = frame.take_rows(&valid_idx);
    let y_valid = y.select(ndarray::Axis(0), &valid_idx);

    let model = TrainedModel::fit(&train, y_train.view(), config, parallelism)?;
    let proba = model.predict_proba(&valid, parallelism);

    let calibration = select_threshold(y_valid.view(), proba.view())?;
    tracing::info!(
        threshold = %calibration.threshold,
        macro_f1 = calibration.macro_f1,
        "selected threshold"
    );

    let y_pred = binarize(proba.view(), calibration.threshold, Cutoff::Inclusive);
    let report = ClassificationReport::new(y_valid.view(), y_pred.view(), &Label::short_names())?;
    Ok(Validation { calibration, report })
}

/// Run the whole training flow and write artifacts under `paths`.
///
/// # Errors
///
/// Schema errors on either table, I/O failures and configuration errors.
/// Nothing is written when the training table is rejected.
pub fn run_training(
    train_csv: impl AsRef<Path>,
    test_csv: Option<&Path>,
    config: &TrainConfig,
    paths: &ArtifactPaths,
) -> Result<TrainingOutcome> {
    let train_csv = train_csv.as_ref();
    run_with_threads(config.n_threads, |parallelism| {
        tracing::info!(path = %train_csv.display(), "loading training table");
        let frame = prepare_training_frame(Frame::read_csv(train_csv)?, &config.schema)?;
        let feature_names = config.schema.feature_names(config.use_product_id);
        frame.require_columns("train", &feature_names)?;
        let y = label_matrix(&frame)?;

        tracing::info!(
            family = %config.family,
            profile = %config.profile,
            rows = frame.n_rows(),
            "training"
        );
        let Validation { calibration, report } = validate(&frame, &y, config, parallelism)?;

        tracing::info!("refitting on all rows");
        let model = TrainedModel::fit(&frame, y.view(), config, parallelism)?;
        paths.ensure_dir()?;
        model.save_json(paths.model())?;
        save_threshold(paths.threshold(), calibration.threshold)?;

        let test_predictions = test_csv
            .map(|test_csv| write_submissions(&model, test_csv, config, paths, parallelism))
            .transpose()?;

        write_text(paths.report(), &report.to_string())?;
        tracing::info!(dir = %paths.dir().display(), "artifacts written");

        Ok(TrainingOutcome {
            n_rows: frame.n_rows(),
            model,
            calibration,
            report,
            test_predictions,
        })
    })
}

fn write_submissions(
    model: &TrainedModel,
    test_csv: &Path,
    config: &TrainConfig,
    paths: &ArtifactPaths,
    parallelism: Parallelism,
) -> Result<Predictions> {
    tracing::info!(path = %test_csv.display(), "predicting test table");
    let test = Frame::read_csv(test_csv)?;
    let mut required = vec![config.schema.id_column.clone()];
    required.extend(model.feature_names().iter().cloned());
    test.require_columns("test", &required)?;

    let predictions = InferenceEngine::new(model)
        .with_id_column(config.schema.id_column.clone())
        .with_parallelism(parallelism)
        .predict(None, &test)?;

    predictions.to_short_frame()?.write_csv(paths.submission())?;
    predictions
        .to_long_frame(&config.schema.labels)?
        .write_csv(paths.submission_long())?;
    Ok(predictions)
}
