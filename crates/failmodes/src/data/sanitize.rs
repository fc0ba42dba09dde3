//! Repair of physically invalid sensor readings.
//!
//! Negative readings are treated as corrupted measurements: they are replaced
//! by the column median instead of dropping the row, so the row count is
//! preserved.

use std::collections::BTreeMap;

use super::frame::{Column, Frame};
use crate::utils::median;

/// Replace negative values in every numeric column not listed in `excluded`.
///
/// Each column is handled on its own: the replacement is the median of that
/// column's non-negative, non-missing values, or `0.0` when there are none.
/// Missing values stay missing. Text columns and excluded columns are never
/// touched.
///
/// Returns the number of repaired cells per column (only columns that needed
/// a repair appear).
pub fn repair_negatives<S: AsRef<str>>(
    frame: &mut Frame,
    excluded: &[S],
) -> BTreeMap<String, usize> {
    let names: Vec<String> = frame
        .iter()
        .filter(|(name, column)| {
            column.is_numeric() && !excluded.iter().any(|e| e.as_ref() == *name)
        })
        .map(|(name, _)| name.to_string())
        .collect();

    let mut repaired = BTreeMap::new();
    for name in names {
        let Some(Column::Numeric(values)) = frame.column_mut(&name) else {
            continue;
        };
        let n_negative = values.iter().filter(|v| **v < 0.0).count();
        if n_negative == 0 {
            continue;
        }

        let fill = median(values.iter().copied().filter(|v| *v >= 0.0)).unwrap_or(0.0);
        for v in values.iter_mut().filter(|v| **v < 0.0) {
            *v = fill;
        }

        tracing::warn!(column = %name, cells = n_negative, fill, "replaced negative readings");
        repaired.insert(name, n_negative);
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::from_columns([
            ("torque", Column::Numeric(vec![-1.0, 10.0, 20.0, f64::NAN, 30.0])),
            ("wear", Column::Numeric(vec![-1.0, -2.0, -3.0, -4.0, -5.0])),
            ("FDF", Column::Numeric(vec![-1.0, 0.0, 1.0, 0.0, 1.0])),
            ("tipo", Column::text(&["L", "M", "H", "L", "L"])),
        ])
        .unwrap()
    }

    #[test]
    fn negatives_become_column_median() {
        let mut f = frame();
        let repaired = repair_negatives(&mut f, &["FDF"]);

        let torque = f.column("torque").unwrap().as_numeric().unwrap();
        assert_eq!(torque[0], 20.0);
        assert!(torque[3].is_nan());
        assert_eq!(repaired["torque"], 1);
    }

    #[test]
    fn all_negative_column_becomes_zero() {
        let mut f = frame();
        repair_negatives(&mut f, &["FDF"]);
        assert_eq!(f.column("wear").unwrap().as_numeric().unwrap(), [0.0; 5]);
    }

    #[test]
    fn excluded_columns_are_untouched() {
        let mut f = frame();
        let before = f.column("FDF").unwrap().clone();
        repair_negatives(&mut f, &["FDF"]);
        assert_eq!(f.column("FDF").unwrap(), &before);
    }
}
