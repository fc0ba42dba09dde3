//! Global decision threshold selection.
//!
//! One threshold is shared by all five labels. It is picked from a fixed
//! grid by maximizing macro-F1 on held-out data.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::labels::N_LABELS;
use crate::metrics::per_label_f1;

// =============================================================================
// Threshold
// =============================================================================

/// A probability cutoff in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    /// Threshold used when none has been calibrated.
    pub const DEFAULT: Threshold = Threshold(0.30);

    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidThreshold(value.to_string()))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for Threshold {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(t: Threshold) -> f64 {
        t.0
    }
}

impl FromStr for Threshold {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 =
            s.trim().parse().map_err(|_| Error::InvalidThreshold(s.trim().to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Cutoff
// =============================================================================

/// Comparison used to turn a probability into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cutoff {
    /// `p >= t`; used for calibration and validation reports.
    ///
    /// Probabilities are `f32`, so the comparison happens at `f32` precision.
    Inclusive,
    /// `p > t`; used when serving predictions.
    Strict,
}

impl Cutoff {
    #[inline]
    pub fn is_positive(self, probability: f32, threshold: Threshold) -> bool {
        let t = threshold.0 as f32;
        match self {
            Cutoff::Inclusive => probability >= t,
            Cutoff::Strict => probability > t,
        }
    }
}

/// Binarize a probability matrix.
pub fn binarize(proba: ArrayView2<f32>, threshold: Threshold, cutoff: Cutoff) -> Array2<u8> {
    proba.mapv(|p| u8::from(cutoff.is_positive(p, threshold)))
}

// =============================================================================
// Calibration
// =============================================================================

/// Candidate thresholds: 0.30 to 0.70 in steps of 0.05.
pub fn threshold_grid() -> Vec<Threshold> {
    (30..=70).step_by(5).map(|pct| Threshold(pct as f64 / 100.0)).collect()
}

/// Score of one grid candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdScore {
    pub threshold: Threshold,
    pub macro_f1: f64,
    pub per_label_f1: [f64; N_LABELS],
}

/// Outcome of [`select_threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub threshold: Threshold,
    pub macro_f1: f64,
}

/// Score every grid threshold with [`Cutoff::Inclusive`].
///
/// # Errors
///
/// [`Error::ShapeMismatch`] if the matrices are not both `[n, 5]`.
pub fn scan_thresholds(
    y_true: ArrayView2<u8>,
    y_proba: ArrayView2<f32>,
) -> Result<Vec<ThresholdScore>> {
    if y_proba.dim() != y_true.dim() {
        return Err(Error::ShapeMismatch {
            context: "y_proba",
            expected: y_true.dim(),
            got: y_proba.dim(),
        });
    }

    threshold_grid()
        .into_iter()
        .map(|threshold| {
            let y_pred = binarize(y_proba, threshold, Cutoff::Inclusive);
            let per_label_f1 = per_label_f1(y_true, y_pred.view())?;
            let macro_f1 = per_label_f1.iter().sum::<f64>() / N_LABELS as f64;
            Ok(ThresholdScore {
                threshold,
                macro_f1,
                per_label_f1,
            })
        })
        .collect()
}

/// Pick the grid threshold with the highest macro-F1.
///
/// Only a strictly better score replaces the current best, so ties keep the
/// smallest threshold.
pub fn select_threshold(y_true: ArrayView2<u8>, y_proba: ArrayView2<f32>) -> Result<Calibration> {
    let scores = scan_thresholds(y_true, y_proba)?;

    let mut best = Calibration {
        threshold: Threshold::DEFAULT,
        macro_f1: -1.0,
    };
    for score in &scores {
        tracing::debug!(
            threshold = %score.threshold,
            macro_f1 = score.macro_f1,
            "threshold candidate"
        );
        if score.macro_f1 > best.macro_f1 {
            best = Calibration {
                threshold: score.threshold,
                macro_f1: score.macro_f1,
            };
        }
    }
    Ok(best)
}
