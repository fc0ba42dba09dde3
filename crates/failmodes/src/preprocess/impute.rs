//! Missing-value imputers fitted on training data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::Column;
use crate::utils::median;

/// Replaces missing numeric values by the training-time median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianImputer {
    pub column: String,
    pub fill: f64,
}

impl MedianImputer {
    /// Fit on `column`. An absent or entirely missing column imputes `0.0`.
    pub fn fit(name: &str, column: Option<&Column>) -> Self {
        let fill = column
            .and_then(|c| median((0..c.len()).filter_map(|row| finite(c, row))))
            .unwrap_or(0.0);
        Self {
            column: name.to_string(),
            fill,
        }
    }

    /// Imputed value of `row`.
    #[inline]
    pub fn value(&self, column: Option<&Column>, row: usize) -> f64 {
        column.and_then(|c| finite(c, row)).unwrap_or(self.fill)
    }
}

fn finite(column: &Column, row: usize) -> Option<f64> {
    column.get_f64(row).filter(|v| v.is_finite())
}

/// Replaces missing categorical values by the training-time most frequent
/// value. Ties go to the lexicographically smallest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostFrequentImputer {
    pub column: String,
    /// `None` when the column had no value at all during fitting.
    pub fill: Option<String>,
}

impl MostFrequentImputer {
    pub fn fit(name: &str, column: Option<&Column>) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        if let Some(c) = column {
            for row in 0..c.len() {
                if let Some(value) = c.get_str(row) {
                    *counts.entry(value.into_owned()).or_default() += 1;
                }
            }
        }

        let mut fill: Option<(String, usize)> = None;
        for (value, count) in counts {
            if fill.as_ref().is_none_or(|(_, best)| count > *best) {
                fill = Some((value, count));
            }
        }

        Self {
            column: name.to_string(),
            fill: fill.map(|(value, _)| value),
        }
    }

    /// Imputed value of `row`.
    pub fn value(&self, column: Option<&Column>, row: usize) -> Option<String> {
        column
            .and_then(|c| c.get_str(row))
            .map(|v| v.into_owned())
            .or_else(|| self.fill.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_ignores_missing_and_defaults_to_zero() {
        let column = Column::Numeric(vec![1.0, f64::NAN, 3.0, 10.0]);
        let imputer = MedianImputer::fit("x", Some(&column));
        assert_eq!(imputer.fill, 3.0);
        assert_eq!(imputer.value(Some(&column), 1), 3.0);
        assert_eq!(imputer.value(Some(&column), 3), 10.0);
        assert_eq!(imputer.value(None, 0), 3.0);

        let empty = MedianImputer::fit("y", Some(&Column::missing_numeric(3)));
        assert_eq!(empty.fill, 0.0);
        assert_eq!(MedianImputer::fit("z", None).fill, 0.0);
    }

    #[test]
    fn most_frequent_breaks_ties_lexicographically() {
        let column = Column::Text(vec![
            Some("M".into()),
            Some("L".into()),
            None,
            Some("M".into()),
            Some("L".into()),
        ]);
        let imputer = MostFrequentImputer::fit("tipo", Some(&column));
        assert_eq!(imputer.fill.as_deref(), Some("L"));
        assert_eq!(imputer.value(Some(&column), 2).as_deref(), Some("L"));
        assert_eq!(imputer.value(Some(&column), 0).as_deref(), Some("M"));

        let column = Column::text(&["H", "M", "M"]);
        assert_eq!(MostFrequentImputer::fit("tipo", Some(&column)).fill.as_deref(), Some("M"));
        assert_eq!(MostFrequentImputer::fit("tipo", None).fill, None);
    }
}
