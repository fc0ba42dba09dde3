//! Failure labels and their column-name codec.
//!
//! The five failure modes are a closed set, so they are modelled as the
//! [`Label`] enum with a fixed canonical order. Human-readable ("long")
//! column names vary per deployment and live in a [`LabelCodec`] value that
//! is passed explicitly wherever names are translated.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{Column, Frame};

/// Number of failure labels.
pub const N_LABELS: usize = 5;

// =============================================================================
// Label
// =============================================================================

/// One of the five independent failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    /// Tool wear failure.
    Fdf,
    /// Heat dissipation failure.
    Fdc,
    /// Power failure.
    Fp,
    /// Overstrain failure.
    Fte,
    /// Random failure.
    Fa,
}

impl Label {
    /// All labels in canonical order.
    pub const ALL: [Label; N_LABELS] = [Label::Fdf, Label::Fdc, Label::Fp, Label::Fte, Label::Fa];

    /// Canonical short column name.
    pub const fn short_name(self) -> &'static str {
        match self {
            Label::Fdf => "FDF",
            Label::Fdc => "FDC",
            Label::Fp => "FP",
            Label::Fte => "FTE",
            Label::Fa => "FA",
        }
    }

    /// Position in canonical order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parse a short column name.
    pub fn from_short_name(name: &str) -> Option<Label> {
        Label::ALL.into_iter().find(|l| l.short_name() == name)
    }

    /// Short names of all labels in canonical order.
    pub fn short_names() -> [&'static str; N_LABELS] {
        Label::ALL.map(Label::short_name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

// =============================================================================
// LabelCodec
// =============================================================================

/// Immutable short ↔ long label name mapping.
///
/// Construct once (usually from configuration) and pass by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct LabelCodec {
    long: [String; N_LABELS],
}

impl Default for LabelCodec {
    fn default() -> Self {
        Self {
            long: [
                "FDF (Falha Desgaste Ferramenta)".to_string(),
                "FDC (Falha Dissipacao Calor)".to_string(),
                "FP (Falha Potencia)".to_string(),
                "FTE (Falha Tensao Excessiva)".to_string(),
                "FA (Falha Aleatoria)".to_string(),
            ],
        }
    }
}

impl LabelCodec {
    /// Build a codec from long names in canonical label order.
    pub fn new(long: [String; N_LABELS]) -> Self {
        Self { long }
    }

    /// Long column name for `label`.
    pub fn long_name(&self, label: Label) -> &str {
        &self.long[label.index()]
    }

    /// Label whose long name is `name`.
    pub fn from_long_name(&self, name: &str) -> Option<Label> {
        Label::ALL.into_iter().find(|l| self.long_name(*l) == name)
    }

    /// Rename long label columns to their short codes.
    ///
    /// Columns that are already short or unrelated keep their names. Column
    /// order and data are untouched, so applying this twice equals applying
    /// it once.
    pub fn to_short_names(&self, frame: &mut Frame) {
        frame.rename_with(|name| self.from_long_name(name).map(|l| l.short_name().to_string()));
    }

    /// Rename short label columns to their long names. Every other column
    /// passes through unchanged.
    pub fn to_long_names(&self, frame: &mut Frame) {
        frame.rename_with(|name| {
            Label::from_short_name(name).map(|l| self.long_name(l).to_string())
        });
    }

    /// Rename in a copy, see [`to_short_names`](Self::to_short_names).
    pub fn shortened(&self, frame: &Frame) -> Frame {
        let mut out = frame.clone();
        self.to_short_names(&mut out);
        out
    }

    /// Rename in a copy, see [`to_long_names`](Self::to_long_names).
    pub fn lengthened(&self, frame: &Frame) -> Frame {
        let mut out = frame.clone();
        self.to_long_names(&mut out);
        out
    }
}

impl TryFrom<BTreeMap<String, String>> for LabelCodec {
    type Error = String;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut codec = LabelCodec::default();
        for (short, long) in map {
            let label = Label::from_short_name(&short)
                .ok_or_else(|| format!("unknown label '{short}'"))?;
            codec.long[label.index()] = long;
        }
        Ok(codec)
    }
}

impl From<LabelCodec> for BTreeMap<String, String> {
    fn from(codec: LabelCodec) -> Self {
        Label::ALL
            .into_iter()
            .map(|l| (l.short_name().to_string(), codec.long_name(l).to_string()))
            .collect()
    }
}

// =============================================================================
// Label values
// =============================================================================

/// Coerce a label value to {0, 1}.
///
/// Missing and NaN values become 0; everything else, infinities included, is
/// clamped to `[0, 1]` and truncated toward zero, so only values `>= 1` count
/// as positive.
#[inline]
pub fn binarize_value(value: Option<f64>) -> u8 {
    match value {
        Some(v) if !v.is_nan() => v.clamp(0.0, 1.0).trunc() as u8,
        _ => 0,
    }
}

/// Normalize a label column to strict binary values. Never fails: malformed
/// cells degrade to 0.
pub fn normalize_label(column: &Column) -> Vec<u8> {
    (0..column.len()).map(|row| binarize_value(column.get_f64(row))).collect()
}

/// Replace every label column of `frame` by its normalized 0/1 version.
/// Label columns that are absent are skipped.
pub fn normalize_labels(frame: &mut Frame) {
    for label in Label::ALL {
        if let Some(column) = frame.column_mut(label.short_name()) {
            let binary = normalize_label(column);
            *column = Column::Numeric(binary.into_iter().map(f64::from).collect());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(1.0), 1)]
    #[case(Some(0.0), 0)]
    #[case(Some(0.7), 0)]
    #[case(Some(5.0), 1)]
    #[case(Some(-3.0), 0)]
    #[case(Some(f64::NAN), 0)]
    #[case(Some(f64::INFINITY), 1)]
    #[case(Some(f64::NEG_INFINITY), 0)]
    #[case(None, 0)]
    fn binarize_cases(#[case] value: Option<f64>, #[case] expected: u8) {
        assert_eq!(binarize_value(value), expected);
    }

    #[test]
    fn normalize_text_column() {
        let column = Column::Text(vec![
            Some("1".into()),
            Some("sim".into()),
            None,
            Some(" 2 ".into()),
            Some("0".into()),
        ]);
        assert_eq!(normalize_label(&column), [1, 0, 0, 1, 0]);
    }

    #[test]
    fn overflowing_text_counts_as_positive() {
        let column = Column::text(&["inf", "1e400", "0.7", "5", "-inf", "nan"]);
        assert_eq!(normalize_label(&column), [1, 1, 0, 1, 0, 0]);
    }

    #[test]
    fn short_long_round_trip() {
        let codec = LabelCodec::default();
        let mut frame = Frame::from_columns([
            ("id", Column::Numeric(vec![1.0])),
            ("FDF (Falha Desgaste Ferramenta)", Column::Numeric(vec![1.0])),
            ("FA (Falha Aleatoria)", Column::Numeric(vec![0.0])),
            ("FP", Column::Numeric(vec![0.0])),
        ])
        .unwrap();
        let original = frame.column_names().to_vec();

        codec.to_short_names(&mut frame);
        assert_eq!(frame.column_names(), ["id", "FDF", "FA", "FP"]);

        let twice = codec.shortened(&frame);
        assert_eq!(twice, frame);

        codec.to_long_names(&mut frame);
        assert_eq!(frame.column_names()[..3], original[..3]);
        assert_eq!(frame.column_names()[3], "FP (Falha Potencia)");
    }

    #[test]
    fn codec_from_partial_map_keeps_defaults() {
        let map = BTreeMap::from([("FA".to_string(), "Random failure".to_string())]);
        let codec = LabelCodec::try_from(map).unwrap();
        assert_eq!(codec.long_name(Label::Fa), "Random failure");
        assert_eq!(codec.long_name(Label::Fp), "FP (Falha Potencia)");

        let bad = BTreeMap::from([("XX".to_string(), "nope".to_string())]);
        assert!(LabelCodec::try_from(bad).is_err());
    }
}
