//! Synthetic machine data for tests and benchmarks.
//!
//! Rows look like the real sensor table (same column names, plausible
//! ranges) and each failure mode is driven by its own sensor pattern so the
//! models have something to learn.

use ndarray::Array2;
use rand::prelude::*;

use crate::config::SchemaConfig;
use crate::data::{Column, Frame};
use crate::labels::{Label, N_LABELS};

/// A synthetic table and its label matrix.
#[derive(Debug, Clone)]
pub struct SyntheticMachines {
    /// `id`, features, the five short label columns and `falha_maquina`.
    pub frame: Frame,
    /// `[n_rows, 5]` in canonical label order.
    pub labels: Array2<u8>,
}

impl SyntheticMachines {
    /// The frame without label columns, as a test table would arrive.
    pub fn features_only(&self) -> Frame {
        let schema = SchemaConfig::default();
        let mut keep = vec![schema.id_column.clone()];
        keep.extend(schema.feature_names(false));
        // every generated column is present, so selection cannot fail
        self.frame.select("synthetic", &keep).unwrap_or_default()
    }
}

/// Generate `n_rows` machines.
///
/// Exactly every fifth row (`id % 5 == 1`) has a tool wear failure (FDF),
/// FA is never positive, the other labels occur at a few percent.
pub fn synthetic_machines(n_rows: usize, seed: u64) -> SyntheticMachines {
    let schema = SchemaConfig::default();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut ids = Vec::with_capacity(n_rows);
    let mut tipo = Vec::with_capacity(n_rows);
    let mut numeric: Vec<Vec<f64>> = vec![Vec::with_capacity(n_rows); 6];
    let mut labels = Array2::<u8>::zeros((n_rows, N_LABELS));

    for row in 0..n_rows {
        let fdf = row % 5 == 0;
        let fdc = !fdf && rng.r#gen::<f64>() < 0.10;
        let fp = !fdf && rng.r#gen::<f64>() < 0.10;
        let fte = !fdf && rng.r#gen::<f64>() < 0.05;

        let kind = match rng.gen_range(0..10) {
            0..=5 => "L",
            6..=8 => "M",
            _ => "H",
        };
        let air = 295.0 + rng.r#gen::<f64>() * 10.0;
        let process_gap =
            if fdc { 7.0 + rng.r#gen::<f64>() * 1.5 } else { 9.5 + rng.r#gen::<f64>() * 3.0 };
        let humidity =
            if fte { 88.0 + rng.r#gen::<f64>() * 10.0 } else { 30.0 + rng.r#gen::<f64>() * 50.0 };
        let rpm = if fdc {
            1200.0 + rng.r#gen::<f64>() * 150.0
        } else {
            1400.0 + rng.r#gen::<f64>() * 1400.0
        };
        let torque =
            if fp { 68.0 + rng.r#gen::<f64>() * 10.0 } else { 15.0 + rng.r#gen::<f64>() * 45.0 };
        let wear = if fdf { 210.0 + rng.r#gen::<f64>() * 40.0 } else { rng.r#gen::<f64>() * 190.0 };

        ids.push((row + 1) as f64);
        tipo.push(Some(kind.to_string()));
        let readings = [air, air + process_gap, humidity, rpm, torque, wear];
        for (column, value) in numeric.iter_mut().zip(readings) {
            column.push(value);
        }

        for (label, positive) in Label::ALL.into_iter().zip([fdf, fdc, fp, fte, false]) {
            labels[[row, label.index()]] = u8::from(positive);
        }
    }

    let mut columns = vec![
        (schema.id_column.clone(), Column::Numeric(ids)),
        (schema.type_column.clone(), Column::Text(tipo)),
    ];
    columns.extend(
        schema
            .numeric_columns
            .iter()
            .cloned()
            .zip(numeric.into_iter().map(Column::Numeric)),
    );
    for label in Label::ALL {
        let values = labels.column(label.index()).iter().map(|&v| f64::from(v)).collect();
        columns.push((label.short_name().to_string(), Column::Numeric(values)));
    }
    let any_failure = labels
        .rows()
        .into_iter()
        .map(|r| f64::from(u8::from(r.iter().any(|&v| v == 1))))
        .collect();
    columns.push((schema.machine_failure_column.clone(), Column::Numeric(any_failure)));

    // all columns have n_rows entries
    let frame = Frame::from_columns(columns).unwrap_or_default();

    SyntheticMachines { frame, labels }
}
