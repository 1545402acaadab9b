//! Configuration for a certification run.
//!
//! Loaded from YAML or JSON, chosen by file extension. Relative artefact
//! paths are resolved against `output_dir`.

use crate::charts::DEFAULT_TOLERANCE;
use crate::error::{CertError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertConfig {
    /// Root under which every run artefact and manifest is written
    pub output_dir: PathBuf,
    /// Dataset to certify
    pub data_csv: Option<PathBuf>,
    /// Schema document (YAML or JSON)
    pub schema: Option<PathBuf>,
    /// Append-only validation log
    pub validation_log: PathBuf,
    pub summary_path: PathBuf,
    /// Chart metadata and materialized chart outputs
    pub charts_dir: PathBuf,
    pub chart_report_path: PathBuf,
    pub halt_on_error: bool,
    pub chart_tolerance: f64,
    /// Program and arguments run on each new manifest
    pub sign_command: Option<Vec<String>>,
    pub log_dir: Option<PathBuf>,
}

impl Default for CertConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            data_csv: None,
            schema: None,
            validation_log: PathBuf::from("validation.jsonl"),
            summary_path: PathBuf::from("validation_summary.json"),
            charts_dir: PathBuf::from("charts"),
            chart_report_path: PathBuf::from("chart_validation.json"),
            halt_on_error: true,
            chart_tolerance: DEFAULT_TOLERANCE,
            sign_command: None,
            log_dir: None,
        }
    }
}

impl CertConfig {
    /// Load configuration from a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let config: Self = if is_yaml {
            serde_yaml::from_str(&contents).map_err(|e| {
                CertError::Config(format!("Invalid config {}: {e}", path.display()))
            })?
        } else {
            serde_json::from_str(&contents).map_err(|e| {
                CertError::Config(format!("Invalid config {}: {e}", path.display()))
            })?
        };

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if !self.chart_tolerance.is_finite() || self.chart_tolerance < 0.0 {
            return Err(CertError::Config(format!(
                "chart_tolerance must be a non-negative number, got {}",
                self.chart_tolerance
            )));
        }
        if self.sign_command.as_ref().is_some_and(Vec::is_empty) {
            return Err(CertError::Config(
                "sign_command must name a program".to_owned(),
            ));
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.output_dir.join(path)
    }

    pub fn validation_log_path(&self) -> PathBuf {
        self.resolve(&self.validation_log)
    }

    pub fn summary_file(&self) -> PathBuf {
        self.resolve(&self.summary_path)
    }

    pub fn charts_path(&self) -> PathBuf {
        self.resolve(&self.charts_dir)
    }

    pub fn chart_report_file(&self) -> PathBuf {
        self.resolve(&self.chart_report_path)
    }

    pub fn data_csv(&self) -> Result<&Path> {
        self.data_csv
            .as_deref()
            .ok_or_else(|| CertError::Config("data_csv is not set".to_owned()))
    }

    pub fn schema(&self) -> Result<&Path> {
        self.schema
            .as_deref()
            .ok_or_else(|| CertError::Config("schema is not set".to_owned()))
    }
}
