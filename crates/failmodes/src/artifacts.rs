//! Layout of the results directory and small artifact readers/writers.

use std::fs;
use std::path::{Path, PathBuf};

use crate::calibrate::Threshold;
use crate::error::{Error, Result};

pub const MODEL_FILE: &str = "model.json";
pub const THRESHOLD_FILE: &str = "best_threshold.txt";
pub const SUBMISSION_FILE: &str = "submission.csv";
pub const SUBMISSION_LONG_FILE: &str = "submission_long.csv";
pub const REPORT_FILE: &str = "classification_report.txt";
pub const API_METRICS_FILE: &str = "api_metrics_last.json";
pub const NUMERIC_SUMMARY_FILE: &str = "resumo_numericas.csv";
/// Download names for scored uploads.
pub const PREDICTIONS_FILE: &str = "predicoes_curto.csv";
pub const PREDICTIONS_LONG_FILE: &str = "predicoes_longos.csv";
pub const PREDICTIONS_BINARY_FILE: &str = "predicoes_binarias.csv";

/// Paths of every artifact inside one results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory (and parents) if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))
    }

    pub fn model(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn threshold(&self) -> PathBuf {
        self.dir.join(THRESHOLD_FILE)
    }

    pub fn submission(&self) -> PathBuf {
        self.dir.join(SUBMISSION_FILE)
    }

    pub fn submission_long(&self) -> PathBuf {
        self.dir.join(SUBMISSION_LONG_FILE)
    }

    pub fn report(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    pub fn api_metrics(&self) -> PathBuf {
        self.dir.join(API_METRICS_FILE)
    }

    pub fn numeric_summary(&self) -> PathBuf {
        self.dir.join(NUMERIC_SUMMARY_FILE)
    }
}

/// Persist a threshold as a bare decimal string.
pub fn save_threshold(path: impl AsRef<Path>, threshold: Threshold) -> Result<()> {
    write_text(path, &threshold.to_string())
}

/// Read a threshold written by [`save_threshold`].
pub fn load_threshold(path: impl AsRef<Path>) -> Result<Threshold> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    text.parse()
}

/// Read a threshold, falling back to [`Threshold::DEFAULT`] when the file is
/// missing or unreadable.
pub fn load_threshold_or_default(path: impl AsRef<Path>) -> Threshold {
    let path = path.as_ref();
    match load_threshold(path) {
        Ok(threshold) => threshold,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                %err,
                default = %Threshold::DEFAULT,
                "using default threshold"
            );
            Threshold::DEFAULT
        }
    }
}

/// Write a UTF-8 text file, creating parent directories.
pub fn write_text(path: impl AsRef<Path>, text: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| Error::io(path, e))
}

/// Write a value as pretty-printed JSON, creating parent directories.
pub fn write_json_pretty<T: serde::Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_text(path, &json)
}
