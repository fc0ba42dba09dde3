//! Client for the remote evaluation API.
//!
//! The service scores a submission CSV (long label names) against hidden
//! ground truth and answers with a JSON metrics document holding at least a
//! five-element `f1_score` array.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use serde::{Deserialize, Serialize};

use crate::artifacts::write_json_pretty;
use crate::calibrate::Threshold;
use crate::error::{Error, Result};
use crate::labels::{Label, LabelCodec, N_LABELS};

/// Default service address.
pub const DEFAULT_API_BASE: &str = "http://34.193.187.218:5000";
/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "BOOTCAMP_API_TOKEN";

const EVALUATE_PATH: &str = "/evaluate/multilabel_metrics";

/// Connection settings.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub api_base: String,
    pub token: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            timeout: Duration::from_secs(90),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), EVALUATE_PATH)
    }
}

/// Metrics returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMetrics {
    /// Per-label F1 in canonical label order.
    pub f1_score: Vec<f64>,
    /// Any other fields, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ApiMetrics {
    /// Parse and check a metrics payload.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedMetrics`] if the payload is not JSON or `f1_score`
    /// is not a five-element array.
    pub fn from_json(text: &str) -> Result<Self> {
        let metrics: ApiMetrics =
            serde_json::from_str(text).map_err(|e| Error::MalformedMetrics(e.to_string()))?;
        if metrics.f1_score.len() != N_LABELS {
            return Err(Error::MalformedMetrics(format!(
                "f1_score has {} entries, expected {N_LABELS}",
                metrics.f1_score.len()
            )));
        }
        Ok(metrics)
    }

    /// F1 of one label.
    pub fn f1(&self, label: Label) -> f64 {
        self.f1_score[label.index()]
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_json_pretty(path, self)?;
        tracing::info!(path = %path.display(), "saved remote metrics");
        Ok(())
    }
}

/// Rename short label columns to long ones in the header line. Every byte
/// after the header is passed through as is.
pub fn map_short_to_long(csv: &[u8], codec: &LabelCodec) -> Result<Vec<u8>> {
    let newline = csv.iter().position(|&b| b == b'\n').unwrap_or(csv.len());
    let header_end = if newline > 0 && csv[newline - 1] == b'\r' { newline - 1 } else { newline };
    let (header, body) = csv.split_at(header_end);

    let mut names = csv::StringRecord::new();
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(header);
    if !reader.read_record(&mut names)? {
        return Ok(csv.to_vec());
    }
    let label_of = |name: &str| Label::from_short_name(name.trim());
    if !names.iter().any(|n| label_of(n).is_some()) {
        return Ok(csv.to_vec());
    }

    let mut out = Vec::with_capacity(csv.len() + 128);
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer.write_record(names.iter().map(|n| label_of(n).map_or(n, |l| codec.long_name(l))))?;
        writer.flush().map_err(|e| Error::io("<csv writer>", e))?;
    }
    while matches!(out.last(), Some(b'\n' | b'\r')) {
        out.pop();
    }
    out.extend_from_slice(body);
    Ok(out)
}

/// Blocking client for the evaluation endpoint.
#[derive(Debug, Clone)]
pub struct EvaluationClient {
    config: RemoteConfig,
    http: Client,
}

impl EvaluationClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    /// Upload a submission and return its metrics.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] on a non-success status, with the raw body
    /// - [`Error::MalformedMetrics`] when the answer lacks a valid `f1_score`
    /// - [`Error::Http`] on transport failures or timeout
    pub fn evaluate(
        &self,
        file_name: &str,
        csv: Vec<u8>,
        threshold: Threshold,
    ) -> Result<ApiMetrics> {
        let url = self.config.endpoint();
        tracing::info!(%url, %threshold, bytes = csv.len(), "submitting for evaluation");

        let part = multipart::Part::bytes(csv)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&url)
            .header("X-API-Key", &self.config.token)
            .query(&[("threshold", threshold.value())])
            .multipart(form)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        tracing::debug!(status = status.as_u16(), "evaluation response");
        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }
        ApiMetrics::from_json(&body)
    }

    /// Read `path`, optionally map label names, and evaluate it.
    pub fn evaluate_file(
        &self,
        path: impl AsRef<Path>,
        threshold: Threshold,
        auto_map: Option<&LabelCodec>,
    ) -> Result<ApiMetrics> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let csv = match auto_map {
            Some(codec) => map_short_to_long(&raw, codec)?,
            None => raw,
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "submission.csv".to_string());
        self.evaluate(&name, csv, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_payload_is_validated() {
        let ok =
            ApiMetrics::from_json(r#"{"f1_score":[0.9,0.5,0.4,0.3,0.0],"macro_f1":0.42}"#).unwrap();
        assert_eq!(ok.f1(Label::Fdf), 0.9);
        assert_eq!(ok.extra["macro_f1"], 0.42);

        assert!(matches!(
            ApiMetrics::from_json(r#"{"f1_score":[0.9]}"#),
            Err(Error::MalformedMetrics(_))
        ));
        assert!(matches!(ApiMetrics::from_json("<html>"), Err(Error::MalformedMetrics(_))));
    }

    #[test]
    fn saved_metrics_keep_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results/api_metrics_last.json");
        let metrics = ApiMetrics::from_json(r#"{"f1_score":[1,1,1,1,1],"note":"ok"}"#).unwrap();
        metrics.save(&path).unwrap();
        let back = ApiMetrics::from_json(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, metrics);
    }

    #[test]
    fn auto_map_renames_short_labels() {
        let codec = LabelCodec::default();
        let mapped = map_short_to_long(b"id,FDF,FA\n1,0.5,0.1\n", &codec).unwrap();
        let text = String::from_utf8(mapped).unwrap();
        assert_eq!(text, "id,FDF (Falha Desgaste Ferramenta),FA (Falha Aleatoria)\n1,0.5,0.1\n");

        let long = b"id,FP (Falha Potencia)\n1,0.2\n";
        assert_eq!(map_short_to_long(long, &codec).unwrap(), long.to_vec());
    }

    #[test]
    fn auto_map_keeps_row_bytes() {
        let codec = LabelCodec::default();
        let csv = b"id,FTE,note\r\n007,0.100000,\"a, b\"\r\n008,1e-3,\r\n";
        let mapped = String::from_utf8(map_short_to_long(csv, &codec).unwrap()).unwrap();
        assert_eq!(
            mapped,
            "id,FTE (Falha Tensao Excessiva),note\r\n007,0.100000,\"a, b\"\r\n008,1e-3,\r\n"
        );
        assert_eq!(map_short_to_long(b"", &codec).unwrap(), b"");
    }

    #[test]
    fn endpoint_joins_base() {
        let config = RemoteConfig::new("t").with_api_base("http://localhost:5000/");
        assert_eq!(config.endpoint(), "http://localhost:5000/evaluate/multilabel_metrics");
    }
}
