//! Inference on messy inputs and reproducibility across thread counts.

use failmodes::calibrate::Threshold;
use failmodes::ensemble::{EnsembleParams, ForestParams};
use failmodes::inference::{InferenceEngine, predict};
use failmodes::testing::synthetic_machines;
use failmodes::{Column, Frame, N_LABELS, Parallelism, TrainConfig, TrainedModel, run_with_threads};

fn config(n_trees: u32) -> TrainConfig {
    TrainConfig::builder()
        .ensemble(EnsembleParams::Forest(ForestParams {
            n_trees,
            ..Default::default()
        }))
        .build()
        .unwrap()
}

fn model() -> TrainedModel {
    let data = synthetic_machines(100, 11);
    TrainedModel::fit(&data.frame, data.labels.view(), &config(12), Parallelism::Sequential)
        .unwrap()
}

fn without(frame: &Frame, column: &str) -> Frame {
    let keep: Vec<String> = frame.column_names().iter().filter(|c| *c != column).cloned().collect();
    frame.select("input", &keep).unwrap()
}

#[test]
fn missing_torque_still_yields_probabilities() {
    let model = model();
    let input = without(&synthetic_machines(15, 3).features_only(), "torque");

    let preds = predict(&model, Some(Threshold::DEFAULT), &input).unwrap();
    assert_eq!(preds.probabilities().dim(), (15, N_LABELS));
    assert!(preds.probabilities().iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn unseen_category_and_blank_cells_are_tolerated() {
    let model = model();
    let input = Frame::from_csv_reader(
        "id,tipo,temperatura_ar,torque\n\
         a1,Z,300.1,40\n\
         a2,,,\n\
         a3,L,-5,80\n"
            .as_bytes(),
    )
    .unwrap();

    let preds = predict(&model, Some(Threshold::DEFAULT), &input).unwrap();
    assert_eq!(preds.n_rows(), 3);
    assert!(preds.probabilities().iter().all(|p| (0.0..=1.0).contains(p)));
    // text ids pass through untouched
    assert_eq!(preds.ids().get_str(0).as_deref(), Some("a1"));
}

#[test]
fn extra_columns_are_ignored() {
    let model = model();
    let data = synthetic_machines(10, 5);
    let with_labels = predict(&model, None, &data.frame).unwrap();
    let features = predict(&model, None, &data.features_only()).unwrap();
    assert_eq!(with_labels.probabilities(), features.probabilities());
}

#[test]
fn column_order_does_not_matter() {
    let model = model();
    let frame = synthetic_machines(12, 6).features_only();
    let mut reversed: Vec<String> = frame.column_names().to_vec();
    reversed.reverse();
    let shuffled = frame.select("input", &reversed).unwrap();

    let a = model.predict_proba(&frame, Parallelism::Sequential);
    let b = model.predict_proba(&shuffled, Parallelism::Sequential);
    assert_eq!(a, b);
}

#[test]
fn row_permutation_permutes_transformed_rows() {
    let model = model();
    let frame = synthetic_machines(12, 6).features_only();
    let order: Vec<usize> = (0..12).rev().collect();
    let permuted = frame.take_rows(&order);

    let x = model.transform().transform(&frame);
    let xp = model.transform().transform(&permuted);
    assert_eq!(x.ncols(), xp.ncols());
    for (i, &src) in order.iter().enumerate() {
        assert_eq!(x.row(src), xp.row(i));
    }
}

#[test]
fn same_seed_same_model_for_any_thread_count() {
    let data = synthetic_machines(100, 21);
    let config = config(16);
    let fit = |threads| {
        run_with_threads(threads, |par| {
            TrainedModel::fit(&data.frame, data.labels.view(), &config, par).unwrap()
        })
    };

    let one = fit(1);
    let four = fit(4);
    assert_eq!(one.classifier(), four.classifier());

    let engine_one = InferenceEngine::new(&one);
    let engine_par = InferenceEngine::new(&four).with_parallelism(Parallelism::Parallel);
    let a = engine_one.predict(None, &data.frame).unwrap();
    let b = engine_par.predict(None, &data.frame).unwrap();
    assert_eq!(a.probabilities(), b.probabilities());
}

#[test]
fn numeric_ids_survive_as_numbers() {
    let model = model();
    let input = Frame::from_columns([
        ("id", Column::Numeric(vec![7.0, 8.0])),
        ("tipo", Column::text(&["M", "H"])),
    ])
    .unwrap();
    let preds = predict(&model, None, &input).unwrap();
    let short = preds.to_short_frame().unwrap();
    assert_eq!(short.column("id").unwrap().get_f64(1), Some(8.0));
}

#[test]
fn binary_table_only_with_threshold() {
    let model = model();
    let frame = synthetic_machines(9, 4).features_only();

    let scores = predict(&model, None, &frame).unwrap();
    assert!(scores.to_binary_frame().unwrap().is_none());

    let decided = predict(&model, Some(Threshold::DEFAULT), &frame).unwrap();
    let binary = decided.to_binary_frame().unwrap().unwrap();
    assert_eq!(binary.n_rows(), 9);
    for row in 0..9 {
        let p = decided.probabilities()[[row, 0]];
        let expected = if p > 0.3 { 1.0 } else { 0.0 };
        assert_eq!(binary.column("FDF").unwrap().get_f64(row), Some(expected));
    }
}
