//! Append-only validation audit log.
//!
//! Each validation call appends exactly one JSON line:
//! `{"ts": ..., "issues": [...], "data_signature": ..., "schema_version": ..., "validated_at": ...}`.
//! Prior lines are never truncated or rewritten.

use super::report::ValidationReport;
use crate::error::{Result, ResultExt as _};
use crate::persist::append_line;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct AuditLine<'a> {
    ts: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

/// Append `report` to the log at `path`.
pub fn append_report(path: &Path, report: &ValidationReport) -> Result<()> {
    let line = serde_json::to_string(&AuditLine {
        ts: Utc::now(),
        report,
    })
    .context("Failed to serialize audit log entry")?;

    append_line(path, &line)?;
    tracing::debug!("Appended validation report to {}", path.display());
    Ok(())
}
