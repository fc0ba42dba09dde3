//! Numeric column summaries.

use super::frame::{Column, Frame};
use crate::error::Result;

/// Quantile with linear interpolation over sorted, finite values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Summarize every numeric column: one output row per input column with
/// `count, mean, std, min, 25%, 50%, 75%, max`.
///
/// `std` is the sample standard deviation (NaN for fewer than two values).
pub fn describe(frame: &Frame) -> Result<Frame> {
    let mut names = Vec::new();
    let mut stats: [Vec<f64>; 8] = Default::default();

    for (name, column) in frame.iter() {
        let Some(values) = column.as_numeric() else {
            continue;
        };
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        finite.sort_by(f64::total_cmp);

        let n = finite.len() as f64;
        let mean = if finite.is_empty() { f64::NAN } else { finite.iter().sum::<f64>() / n };
        let std = if finite.len() < 2 {
            f64::NAN
        } else {
            (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };

        let row = [
            n,
            mean,
            std,
            finite.first().copied().unwrap_or(f64::NAN),
            quantile(&finite, 0.25),
            quantile(&finite, 0.5),
            quantile(&finite, 0.75),
            finite.last().copied().unwrap_or(f64::NAN),
        ];
        for (dst, v) in stats.iter_mut().zip(row) {
            dst.push(v);
        }
        names.push(Some(name.to_string()));
    }

    let headers = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
    let mut out = Frame::from_columns([("column", Column::Text(names))])?;
    for (header, values) in headers.into_iter().zip(stats) {
        out.set_column(header, Column::Numeric(values))?;
    }
    Ok(out)
}
