//! Full training flow on synthetic tables written to a temp directory.

use std::fs;
use std::path::Path;

use failmodes::artifacts::{ArtifactPaths, load_threshold};
use failmodes::calibrate::threshold_grid;
use failmodes::dashboard::DashboardSession;
use failmodes::ensemble::{EnsembleParams, ForestParams};
use failmodes::testing::synthetic_machines;
use failmodes::train::run_training;
use failmodes::utils::median;
use failmodes::{Column, Frame, Label, Parallelism, SchemaConfig, TrainConfig, TrainedModel};

fn write_tables(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let train = dir.join("train.csv");
    let test = dir.join("test.csv");
    synthetic_machines(100, 42).frame.write_csv(&train).unwrap();
    synthetic_machines(30, 7).features_only().write_csv(&test).unwrap();
    (train, test)
}

fn forest_config() -> TrainConfig {
    TrainConfig::builder()
        .ensemble(EnsembleParams::Forest(ForestParams {
            n_trees: 20,
            ..Default::default()
        }))
        .n_threads(1)
        .build()
        .unwrap()
}

/// One row holding the training median of every numeric feature.
fn median_row(train: &Frame, schema: &SchemaConfig) -> Frame {
    let mut columns = vec![(schema.type_column.clone(), Column::text(&["L"]))];
    for name in &schema.numeric_columns {
        let values = train.column(name).unwrap().as_numeric().unwrap();
        let m = median(values.iter().copied()).unwrap();
        columns.push((name.clone(), Column::Numeric(vec![m])));
    }
    Frame::from_columns(columns).unwrap()
}

#[test]
fn forest_run_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (train, test) = write_tables(dir.path());
    let paths = ArtifactPaths::new(dir.path().join("results"));

    let outcome = run_training(&train, Some(test.as_path()), &forest_config(), &paths).unwrap();

    assert!(threshold_grid().contains(&outcome.calibration.threshold));
    assert!((0.0..=1.0).contains(&outcome.calibration.macro_f1));
    assert_eq!(outcome.n_rows, 100);
    assert_eq!(load_threshold(paths.threshold()).unwrap(), outcome.calibration.threshold);

    let submission = Frame::read_csv(paths.submission()).unwrap();
    assert_eq!(submission.column_names(), ["id", "FDF", "FDC", "FP", "FTE", "FA"]);
    assert_eq!(submission.n_rows(), 30);
    for label in Label::ALL {
        let values = submission.column(label.short_name()).unwrap().as_numeric().unwrap();
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }
    assert_eq!(submission.column("id").unwrap().get_f64(0), Some(1.0));

    let long = Frame::read_csv(paths.submission_long()).unwrap();
    assert_eq!(long.column_names()[5], "FA (Falha Aleatoria)");

    let report = fs::read_to_string(paths.report()).unwrap();
    assert!(report.contains("precision"));
    assert!(report.contains("samples avg"));
}

#[test]
fn median_row_gets_five_probabilities() {
    let dir = tempfile::tempdir().unwrap();
    let (train, _) = write_tables(dir.path());
    let paths = ArtifactPaths::new(dir.path().join("results"));
    let outcome = run_training(&train, None, &forest_config(), &paths).unwrap();
    assert!(outcome.test_predictions.is_none());
    assert!(!paths.submission().exists());

    let schema = SchemaConfig::default();
    let row = median_row(&synthetic_machines(100, 42).frame, &schema);
    let proba = outcome.model.predict_proba(&row, Parallelism::Sequential);
    assert_eq!(proba.dim(), (1, 5));
    assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));

    // FA never occurs in training
    assert_eq!(proba[[0, Label::Fa.index()]], 0.0);
}

#[test]
fn dashboard_reads_what_training_wrote() {
    let dir = tempfile::tempdir().unwrap();
    let (train, test) = write_tables(dir.path());
    let paths = ArtifactPaths::new(dir.path().join("results"));
    let outcome = run_training(&train, None, &forest_config(), &paths).unwrap();

    let session = DashboardSession::open(paths.clone()).unwrap();
    assert_eq!(session.default_threshold(), outcome.calibration.threshold);

    let upload = fs::read(&test).unwrap();
    let result = session.predict_csv(&upload, None).unwrap();
    assert_eq!(result.predictions.n_rows(), 30);

    let loaded = TrainedModel::load_json(paths.model()).unwrap();
    assert_eq!(&loaded, session.model());
}

#[test]
fn missing_label_column_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let train = dir.path().join("train.csv");
    let mut frame = synthetic_machines(20, 1).frame;
    frame = frame
        .select(
            "train",
            &frame
                .column_names()
                .iter()
                .filter(|c| c.as_str() != "FTE")
                .cloned()
                .collect::<Vec<_>>(),
        )
        .unwrap();
    frame.write_csv(&train).unwrap();

    let paths = ArtifactPaths::new(dir.path().join("results"));
    let err = run_training(&train, None, &forest_config(), &paths).unwrap_err();
    assert!(matches!(err, failmodes::Error::MissingColumns { .. }));
    assert!(!paths.model().exists());
}

#[cfg(feature = "gbdt")]
#[test]
fn boosted_family_trains_end_to_end() {
    use failmodes::ensemble::BoostParams;

    let dir = tempfile::tempdir().unwrap();
    let (train, test) = write_tables(dir.path());
    let paths = ArtifactPaths::new(dir.path().join("results"));
    let config = TrainConfig::builder()
        .ensemble(EnsembleParams::Gbdt(BoostParams {
            n_trees: 20,
            ..Default::default()
        }))
        .n_threads(1)
        .build()
        .unwrap();

    let outcome = run_training(&train, Some(test.as_path()), &config, &paths).unwrap();
    assert!(threshold_grid().contains(&outcome.calibration.threshold));
    assert_eq!(outcome.model.meta().family, failmodes::ModelFamily::Gbdt);
    let preds = outcome.test_predictions.unwrap();
    assert!(preds.probabilities().iter().all(|p| (0.0..=1.0).contains(p)));
}
