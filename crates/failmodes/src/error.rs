//! Error types shared across the crate.
//!
//! Only structural problems are errors here. Malformed label values, negative
//! sensor readings and unseen categories are repaired in place and never
//! surface as an [`Error`].

use std::path::PathBuf;

use crate::config::ConfigError;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the failure-mode pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A table lacks columns the pipeline requires.
    #[error("[{table}] missing columns: {missing:?}\ncolumns found: {found:?}")]
    MissingColumns {
        table: String,
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// Column lengths disagree inside one table.
    #[error("column '{column}' has {got} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        got: usize,
    },

    /// Matrix shapes passed to a model or metric disagree.
    #[error("shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// Training was attempted on an empty table.
    #[error("cannot train on an empty dataset")]
    EmptyDataset,

    /// The requested model family was not compiled into this build.
    #[error("model family '{0}' is not available in this build (enable the '{0}' feature)")]
    FamilyUnavailable(&'static str),

    /// A persisted model failed structural checks.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A persisted model was written by an incompatible format version.
    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    /// A decision threshold outside `[0, 1]` or not a number.
    #[error("invalid threshold '{0}': expected a number in [0, 1]")]
    InvalidThreshold(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to parse config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote evaluation API answered with a non-success status.
    #[error("remote evaluation failed with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// The remote evaluation API answered with an unexpected payload.
    #[error("unexpected metrics payload: {0}")]
    MalformedMetrics(String),

    #[cfg(feature = "remote")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Attach a path to an I/O error.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
