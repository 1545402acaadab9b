//! End-to-end certification run.
//!
//! Validate the dataset, persist the validation summary, check chart
//! consistency, record provenance and lineage, then seal the output root with
//! a manifest linked to the previous run. Each step is recorded in the pipeline audit log. A halted
//! validation stops the run before any chart check or manifest is produced.

use crate::audit::AuditLogger;
use crate::charts::{
    ChartChecker, ChartValidationReport, load_chart_specs, load_materialized_charts,
};
use crate::config::CertConfig;
use crate::error::{CertError, Result};
use crate::frame::load_csv;
use crate::issues::Context;
use crate::manifest::{
    CommandSigner, Lineage, ManifestRecord, ManifestWriter, Provenance, ProvenanceInputs,
    latest_manifest_hash,
};
use crate::schema::{
    SchemaDefinition, ValidateOptions, ValidationReport, save_summary, validate_dataframe,
};
use serde_json::{Value, json};
use std::path::PathBuf;

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub validation: ValidationReport,
    /// `None` when the output root has no charts directory.
    pub charts: Option<ChartValidationReport>,
    pub manifest_path: PathBuf,
    pub manifest_hash: String,
}

impl RunOutcome {
    /// True when validation or chart checking found errors.
    pub fn has_errors(&self) -> bool {
        self.validation.has_errors() || self.charts.as_ref().is_some_and(|c| c.has_errors())
    }
}

fn fields(value: Value) -> Context {
    match value {
        Value::Object(map) => map,
        _ => Context::new(),
    }
}

/// Run a full certification as described by `config`.
///
/// The manifest is signed with `config.sign_command` when one is set.
///
/// # Errors
///
/// [`CertError::ValidationFailed`] when validation finds errors and
/// `halt_on_error` is set; otherwise any I/O or input error from a step.
pub fn certify(config: &CertConfig) -> Result<RunOutcome> {
    let data_csv = config.data_csv()?;
    let schema_path = config.schema()?;
    let audit = AuditLogger::for_root(&config.output_dir);

    audit.info(
        "run_started",
        fields(json!({
            "data_csv": data_csv.display().to_string(),
            "schema": schema_path.display().to_string(),
        })),
    )?;

    let schema = SchemaDefinition::load(schema_path)?;
    let df = load_csv(data_csv)?;

    let options = ValidateOptions {
        log_path: Some(config.validation_log_path()),
        halt_on_error: config.halt_on_error,
    };

    let validation = match validate_dataframe(&df, &schema, &options) {
        Ok(report) => report,
        Err(CertError::ValidationFailed {
            error_count,
            report,
        }) => {
            save_summary(&report, &config.summary_file())?;
            audit.error(
                "validation_halted",
                fields(json!({
                    "data_signature": report.data_signature,
                    "error_count": error_count,
                })),
            )?;
            return Err(CertError::ValidationFailed {
                error_count,
                report,
            });
        }
        Err(e) => return Err(e),
    };

    save_summary(&validation, &config.summary_file())?;
    audit.info(
        "validation_completed",
        fields(json!({
            "data_signature": validation.data_signature,
            "error_count": validation.errors().count(),
            "warning_count": validation.warnings().count(),
        })),
    )?;

    let charts_dir = config.charts_path();
    let mut chart_ids = Vec::new();
    let charts = if charts_dir.is_dir() {
        let specs = load_chart_specs(&charts_dir)?;
        chart_ids = specs.iter().map(|s| s.identifier.clone()).collect();
        let outputs = load_materialized_charts(&charts_dir, &specs)?;
        let report = ChartChecker::new(config.chart_tolerance).validate(&df, &specs, &outputs)?;
        report.save(&config.chart_report_file())?;

        let event = fields(json!({
            "charts": specs.len(),
            "error_count": report.errors().count(),
            "warning_count": report.warnings().count(),
        }));
        if report.has_errors() {
            audit.warn("charts_checked", event)?;
        } else {
            audit.info("charts_checked", event)?;
        }
        Some(report)
    } else {
        audit.warn(
            "charts_skipped",
            fields(json!({ "charts_dir": charts_dir.display().to_string() })),
        )?;
        None
    };

    Provenance::new(
        ProvenanceInputs {
            data_csv: data_csv.to_path_buf(),
            schema: schema_path.to_path_buf(),
        },
        validation.data_signature.clone(),
    )
    .with_schema_version(validation.schema_version.clone())
    .with_charts(chart_ids.clone())
    .save(&config.output_dir)?;
    Lineage::for_run(validation.schema_version.as_deref(), &chart_ids).save(&config.output_dir)?;

    let prev = latest_manifest_hash(&config.output_dir)?;
    // Logged before sealing so the manifest covers the complete audit trail.
    audit.info(
        "run_sealing",
        fields(json!({ "prev_manifest_hash": prev })),
    )?;

    let mut writer = ManifestWriter::new();
    if let Some(signer) = config
        .sign_command
        .as_deref()
        .and_then(CommandSigner::from_argv)
    {
        writer = writer.with_signer(signer);
    }
    let manifest_path = writer.write(&config.output_dir, prev.as_deref())?;
    let manifest_hash = ManifestRecord::load(&manifest_path)?.manifest_hash;

    tracing::info!("Certification run sealed by {}", manifest_path.display());

    Ok(RunOutcome {
        validation,
        charts,
        manifest_path,
        manifest_hash,
    })
}
