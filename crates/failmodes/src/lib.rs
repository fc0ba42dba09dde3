//! failmodes: multi-label machine failure prediction.
//!
//! Predicts five independent failure modes (FDF, FDC, FP, FTE, FA) from
//! sensor readings with per-label tree ensembles, a globally calibrated
//! decision threshold and a small artifact layout on disk.
//!
//! # Key Types
//!
//! - [`TrainedModel`] - preprocessing + five estimators, persisted as JSON
//! - [`TrainConfig`] - run configuration builder
//! - [`Frame`] - named-column tables with CSV I/O
//! - [`LabelCodec`] - short/long label column names
//! - [`Threshold`] / [`Cutoff`] - decision threshold and comparison
//!
//! # Training
//!
//! [`train::run_training`] runs the whole flow: cleaning, validation split,
//! threshold calibration, refit, artifacts and submissions.
//!
//! # Serving
//!
//! [`inference::predict`] scores raw frames; [`dashboard::DashboardSession`]
//! wraps it for CSV uploads.

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod artifacts;
pub mod calibrate;
pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod inference;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod preprocess;
#[cfg(feature = "remote")]
pub mod remote;
pub mod testing;
pub mod train;
pub mod tree;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use calibrate::{Calibration, Cutoff, Threshold, select_threshold};
pub use classifier::MultiLabelClassifier;
pub use config::{ConfigError, ModelFamily, Profile, SchemaConfig, TrainConfig};
pub use data::{Column, Frame};
pub use error::{Error, Result};
pub use inference::{InferenceEngine, Predictions};
pub use labels::{Label, LabelCodec, N_LABELS};
pub use metrics::ClassificationReport;
pub use model::{ModelMeta, TrainedModel};

// Shared utilities
pub use utils::{Parallelism, run_with_threads};
