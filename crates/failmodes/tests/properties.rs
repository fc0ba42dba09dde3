//! Property-based tests for the data cleaning and calibration invariants.

use ndarray::Array2;
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use failmodes::calibrate::{select_threshold, threshold_grid};
use failmodes::data::repair_negatives;
use failmodes::labels::{binarize_value, normalize_label};
use failmodes::{Column, Frame, Label, LabelCodec, N_LABELS};

// =============================================================================
// Strategies
// =============================================================================

/// Any f64 including NaN, infinities and out-of-range values.
fn arb_cell() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        Just(Some(f64::NAN)),
        Just(Some(f64::INFINITY)),
        Just(Some(f64::NEG_INFINITY)),
        (-1e6f64..1e6).prop_map(Some),
        (0u8..3).prop_map(|v| Some(f64::from(v))),
    ]
}

fn arb_text_cell() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        "[0-9]{1,3}".prop_map(Some),
        "[a-z ]{0,6}".prop_map(Some),
        Just(Some("-1".to_string())),
        Just(Some(" 1 ".to_string())),
    ]
}

/// Numeric sensor columns with some negative and missing readings.
fn arb_sensor(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop_vec(
        prop_oneof![
            8 => -100.0f64..500.0,
            1 => Just(f64::NAN),
        ],
        len,
    )
}

/// Column names mixing short labels, long labels and unrelated names.
fn arb_names() -> impl Strategy<Value = Vec<String>> {
    let codec = LabelCodec::default();
    let mut pool: Vec<String> = Label::ALL.iter().map(|l| l.short_name().to_string()).collect();
    pool.extend(Label::ALL.iter().map(|l| codec.long_name(*l).to_string()));
    pool.extend(["id", "tipo", "torque"].map(String::from));
    proptest::sample::subsequence(pool, 0..=13).prop_shuffle()
}

fn frame_with_names(names: &[String]) -> Frame {
    Frame::from_columns(names.iter().map(|n| (n.clone(), Column::Numeric(vec![0.0])))).unwrap()
}

// =============================================================================
// Labels
// =============================================================================

proptest! {
    #[test]
    fn binarized_values_are_binary(cell in arb_cell()) {
        prop_assert!(binarize_value(cell) <= 1);
    }

    #[test]
    fn normalized_text_labels_are_binary(cells in prop_vec(arb_text_cell(), 0..30)) {
        let column = Column::Text(cells);
        let out = normalize_label(&column);
        prop_assert_eq!(out.len(), column.len());
        prop_assert!(out.iter().all(|v| *v <= 1));
    }

    #[test]
    fn short_names_are_idempotent_and_reversible(names in arb_names()) {
        // a frame cannot hold both the short and long name of one label
        let codec = LabelCodec::default();
        let mut seen = std::collections::HashSet::new();
        let names: Vec<String> = names
            .into_iter()
            .filter(|n| {
                let key = codec
                    .from_long_name(n)
                    .map(|l| l.short_name().to_string())
                    .unwrap_or_else(|| n.clone());
                seen.insert(key)
            })
            .collect();

        let frame = frame_with_names(&names);
        let once = codec.shortened(&frame);
        let twice = codec.shortened(&once);
        prop_assert_eq!(once.column_names(), twice.column_names());

        let restored = codec.lengthened(&once);
        let all_long = codec.lengthened(&frame);
        prop_assert_eq!(restored.column_names(), all_long.column_names());
        for (name, column) in restored.iter() {
            prop_assert!(Label::from_short_name(name).is_none());
            prop_assert_eq!(column.len(), 1);
        }
    }
}

// =============================================================================
// Sensor repair
// =============================================================================

proptest! {
    #[test]
    fn repair_leaves_no_negatives(
        torque in arb_sensor(25),
        wear in arb_sensor(25),
        label in prop_vec(-2.0f64..2.0, 25),
    ) {
        let mut frame = Frame::from_columns([
            ("torque", Column::Numeric(torque.clone())),
            ("wear", Column::Numeric(wear)),
            ("FDF", Column::Numeric(label.clone())),
        ])
        .unwrap();
        repair_negatives(&mut frame, &["FDF"]);

        for name in ["torque", "wear"] {
            let values = frame.column(name).unwrap().as_numeric().unwrap();
            prop_assert!(values.iter().all(|v| v.is_nan() || *v >= 0.0));
        }
        prop_assert_eq!(frame.column("FDF").unwrap().as_numeric().unwrap(), label.as_slice());

        // non-negative and missing cells are kept as they were
        let repaired = frame.column("torque").unwrap().as_numeric().unwrap();
        for (before, after) in torque.iter().zip(repaired) {
            if before.is_nan() {
                prop_assert!(after.is_nan());
            } else if *before >= 0.0 {
                prop_assert_eq!(before, after);
            }
        }
    }
}

// =============================================================================
// Calibration
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn selected_threshold_is_on_grid(
        rows in 1usize..40,
        seed in any::<u64>(),
    ) {
        let mut state = seed;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as u32
        };
        let y = Array2::from_shape_fn((rows, N_LABELS), |_| (next() % 2) as u8);
        let p = Array2::from_shape_fn((rows, N_LABELS), |_| (next() % 1001) as f32 / 1000.0);

        let calibration = select_threshold(y.view(), p.view()).unwrap();
        prop_assert!(threshold_grid().contains(&calibration.threshold));
        prop_assert!((0.0..=1.0).contains(&calibration.macro_f1));
    }
}
