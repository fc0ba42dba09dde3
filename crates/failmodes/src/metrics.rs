//! Multi-label classification metrics.
//!
//! Every ratio with a zero denominator is reported as `0.0`.

use std::fmt;

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::labels::{Label, N_LABELS};

#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

// =============================================================================
// Confusion counts
// =============================================================================

/// Binary confusion counts for one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tn: usize,
}

impl Confusion {
    pub fn from_columns(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> Self {
        let mut c = Confusion::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1, p == 1) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (true, false) => c.fn_ += 1,
                (false, false) => c.tn += 1,
            }
        }
        c
    }

    fn add(&mut self, other: Confusion) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
        self.tn += other.tn;
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fp) as f64)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fn_) as f64)
    }

    pub fn f1(&self) -> f64 {
        ratio(2.0 * self.tp as f64, (2 * self.tp + self.fp + self.fn_) as f64)
    }

    /// Number of true positives in the ground truth.
    pub fn support(&self) -> usize {
        self.tp + self.fn_
    }

    pub fn scores(&self) -> Scores {
        Scores {
            precision: self.precision(),
            recall: self.recall(),
            f1: self.f1(),
            support: self.support(),
        }
    }
}

fn check_shapes(y_true: ArrayView2<u8>, y_pred: ArrayView2<u8>) -> Result<()> {
    if y_true.ncols() != N_LABELS {
        return Err(Error::ShapeMismatch {
            context: "y_true",
            expected: (y_true.nrows(), N_LABELS),
            got: y_true.dim(),
        });
    }
    if y_pred.dim() != y_true.dim() {
        return Err(Error::ShapeMismatch {
            context: "y_pred",
            expected: y_true.dim(),
            got: y_pred.dim(),
        });
    }
    Ok(())
}

/// Per-label F1 in canonical order.
pub fn per_label_f1(y_true: ArrayView2<u8>, y_pred: ArrayView2<u8>) -> Result<[f64; N_LABELS]> {
    check_shapes(y_true, y_pred)?;
    Ok(Label::ALL.map(|l| {
        Confusion::from_columns(y_true.column(l.index()), y_pred.column(l.index())).f1()
    }))
}

/// Unweighted mean of the per-label F1 scores.
pub fn macro_f1(y_true: ArrayView2<u8>, y_pred: ArrayView2<u8>) -> Result<f64> {
    let f1 = per_label_f1(y_true, y_pred)?;
    Ok(f1.iter().sum::<f64>() / N_LABELS as f64)
}

// =============================================================================
// Classification report
// =============================================================================

/// Precision, recall, F1 and support of one row of the report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-label scores plus micro, macro, weighted and samples averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub labels: Vec<(String, Scores)>,
    pub micro: Scores,
    pub macro_avg: Scores,
    pub weighted: Scores,
    pub samples: Scores,
    /// Decimal places when rendered.
    #[serde(skip, default = "default_digits")]
    pub digits: usize,
}

fn default_digits() -> usize {
    2
}

impl ClassificationReport {
    /// Score `y_pred` against `y_true` (both `[n, 5]`, 0/1). `names` label
    /// the rows, in canonical order.
    pub fn new<S: AsRef<str>>(
        y_true: ArrayView2<u8>,
        y_pred: ArrayView2<u8>,
        names: &[S; N_LABELS],
    ) -> Result<Self> {
        check_shapes(y_true, y_pred)?;

        let confusions = Label::ALL
            .map(|l| Confusion::from_columns(y_true.column(l.index()), y_pred.column(l.index())));
        let per_label = confusions.map(|c| c.scores());
        let total_support: usize = per_label.iter().map(|s| s.support).sum();

        let mut pooled = Confusion::default();
        confusions.iter().for_each(|c| pooled.add(*c));
        let micro = Scores {
            support: total_support,
            ..pooled.scores()
        };

        let mean = |f: fn(&Scores) -> f64| per_label.iter().map(f).sum::<f64>() / N_LABELS as f64;
        let macro_avg = Scores {
            precision: mean(|s| s.precision),
            recall: mean(|s| s.recall),
            f1: mean(|s| s.f1),
            support: total_support,
        };

        let weighted_mean = |f: fn(&Scores) -> f64| {
            ratio(
                per_label.iter().map(|s| f(s) * s.support as f64).sum::<f64>(),
                total_support as f64,
            )
        };
        let weighted = Scores {
            precision: weighted_mean(|s| s.precision),
            recall: weighted_mean(|s| s.recall),
            f1: weighted_mean(|s| s.f1),
            support: total_support,
        };

        let n_rows = y_true.nrows();
        let (mut p_sum, mut r_sum, mut f_sum) = (0.0, 0.0, 0.0);
        for (t_row, p_row) in y_true.rows().into_iter().zip(y_pred.rows()) {
            let c = Confusion::from_columns(t_row, p_row);
            p_sum += c.precision();
            r_sum += c.recall();
            f_sum += c.f1();
        }
        let samples = Scores {
            precision: ratio(p_sum, n_rows as f64),
            recall: ratio(r_sum, n_rows as f64),
            f1: ratio(f_sum, n_rows as f64),
            support: total_support,
        };

        Ok(Self {
            labels: names
                .iter()
                .map(|n| n.as_ref().to_string())
                .zip(per_label)
                .collect(),
            micro,
            macro_avg,
            weighted,
            samples,
            digits: default_digits(),
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.digits;
        let width = self
            .labels
            .iter()
            .map(|(name, _)| name.chars().count())
            .chain(["weighted avg".len(), digits])
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        let row = |f: &mut fmt::Formatter<'_>, name: &str, s: &Scores| {
            writeln!(
                f,
                "{name:>width$}  {:>9.digits$} {:>9.digits$} {:>9.digits$} {:>9}",
                s.precision, s.recall, s.f1, s.support
            )
        };
        for (name, scores) in &self.labels {
            row(f, name, scores)?;
        }
        writeln!(f)?;
        row(f, "micro avg", &self.micro)?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted)?;
        row(f, "samples avg", &self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    #[test]
    fn f1_with_zero_division_is_zero() {
        let c = Confusion::default();
        assert_eq!(c.f1(), 0.0);
        assert_eq!(c.precision(), 0.0);

        let c = Confusion { tp: 2, fp: 1, fn_: 1, tn: 6 };
        assert_relative_eq!(c.precision(), 2.0 / 3.0);
        assert_relative_eq!(c.f1(), 4.0 / 6.0);
        assert_eq!(c.support(), 3);
    }

    #[test]
    fn macro_f1_averages_labels() {
        let y_true = array![[1u8, 0, 0, 0, 0], [0, 0, 0, 0, 0], [1, 0, 0, 0, 0]];
        let y_pred = y_true.clone();
        // only the first label can score; the rest have F1 = 0
        assert_relative_eq!(macro_f1(y_true.view(), y_pred.view()).unwrap(), 0.2);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let a = Array2::<u8>::zeros((3, 5));
        let b = Array2::<u8>::zeros((2, 5));
        assert!(matches!(macro_f1(a.view(), b.view()), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn report_layout() {
        let y_true = array![[1u8, 0, 1, 0, 0], [0, 1, 0, 0, 0], [1, 1, 0, 0, 0], [0, 0, 0, 0, 0]];
        let y_pred = array![[1u8, 0, 0, 0, 0], [0, 1, 0, 0, 0], [1, 0, 0, 0, 1], [0, 0, 0, 0, 0]];
        let report =
            ClassificationReport::new(y_true.view(), y_pred.view(), &Label::short_names()).unwrap();

        assert_eq!(report.labels[0].1.support, 2);
        assert_relative_eq!(report.labels[0].1.f1, 1.0);
        assert_relative_eq!(report.micro.precision, 3.0 / 4.0);
        assert_relative_eq!(report.micro.recall, 3.0 / 5.0);
        assert_eq!(report.weighted.support, 5);

        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "              precision    recall  f1-score   support");
        assert_eq!(lines[2], "         FDF       1.00      1.00      1.00         2");
        assert!(lines.iter().any(|l| l.starts_with("weighted avg")));
        assert!(lines.last().is_some_and(|l| l.trim_start().starts_with("samples avg")));
    }
}
