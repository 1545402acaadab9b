//! Validation issues, reports and the persisted summary document.

use crate::error::{Result, ResultExt as _};
use crate::issues::{Context, IssueLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// What a validation finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssueKind {
    MissingRequiredColumn,
    OptionalColumnMissing,
    NullNotPermitted,
    UnsupportedDtypeDeclaration,
    DtypeMismatch,
    ValueOutsideAllowedSet,
    ValueBelowMinimum,
    ValueAboveMaximum,
    /// A minimum/maximum is declared on a column that holds no numbers.
    RangeOnNonNumericColumn,
    UnexpectedColumnPresent,
}

impl ValidationIssueKind {
    pub fn level(self) -> IssueLevel {
        match self {
            Self::OptionalColumnMissing | Self::UnexpectedColumnPresent => IssueLevel::Warn,
            _ => IssueLevel::Error,
        }
    }

    /// Default human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingRequiredColumn => "Missing required column",
            Self::OptionalColumnMissing => "Optional column missing",
            Self::NullNotPermitted => "Null values not permitted",
            Self::UnsupportedDtypeDeclaration => "Unsupported dtype in schema",
            Self::DtypeMismatch => "Unexpected dtype",
            Self::ValueOutsideAllowedSet => "Values outside allowed set",
            Self::ValueBelowMinimum => "Values below minimum",
            Self::ValueAboveMaximum => "Values above maximum",
            Self::RangeOnNonNumericColumn => "Range bounds declared on a non-numeric column",
            Self::UnexpectedColumnPresent => "Unexpected column present",
        }
    }
}

/// A single schema finding. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: IssueLevel,
    pub kind: ValidationIssueKind,
    pub column: Option<String>,
    pub message: String,
    #[serde(default)]
    pub context: Context,
}

impl ValidationIssue {
    pub fn new(kind: ValidationIssueKind, column: impl Into<String>) -> Self {
        Self {
            level: kind.level(),
            kind,
            column: Some(column.into()),
            message: kind.message().to_owned(),
            context: Context::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_owned(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == IssueLevel::Error
    }
}

/// Outcome of one validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub data_signature: String,
    pub schema_version: Option<String>,
    pub validated_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.level == IssueLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.level == IssueLevel::Warn)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize validation report")
    }

    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            validated_at: self.validated_at,
            schema_version: self.schema_version.clone(),
            data_signature: self.data_signature.clone(),
            error_count: self.errors().count(),
            warning_count: self.warnings().count(),
            issues: self.issues.clone(),
        }
    }
}

/// Human-readable audit summary of a validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub validated_at: DateTime<Utc>,
    pub schema_version: Option<String>,
    pub data_signature: String,
    pub error_count: usize,
    pub warning_count: usize,
    pub issues: Vec<ValidationIssue>,
}

/// Persist the summary of `report` to `destination` as pretty JSON.
pub fn save_summary(report: &ValidationReport, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(&report.summary())
        .context("Failed to serialize validation summary")?;

    std::fs::write(destination, json)
        .with_context(|| format!("Failed to write summary to {}", destination.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn report() -> ValidationReport {
        ValidationReport {
            issues: vec![
                ValidationIssue::new(ValidationIssueKind::MissingRequiredColumn, "id"),
                ValidationIssue::new(ValidationIssueKind::UnexpectedColumnPresent, "extra"),
                ValidationIssue::new(ValidationIssueKind::NullNotPermitted, "age")
                    .with_context("null_count", 2),
            ],
            data_signature: "abc".to_owned(),
            schema_version: Some("1".to_owned()),
            validated_at: Utc::now(),
        }
    }

    #[test]
    fn test_level_follows_kind() {
        assert_eq!(
            ValidationIssueKind::OptionalColumnMissing.level(),
            IssueLevel::Warn
        );
        assert_eq!(
            ValidationIssueKind::ValueAboveMaximum.level(),
            IssueLevel::Error
        );
    }

    #[test]
    fn test_partition_errors_and_warnings() {
        let report = report();
        assert_eq!(report.errors().count(), 2);
        assert_eq!(report.warnings().count(), 1);
        assert!(report.has_errors());
    }

    #[test]
    fn test_issue_serialization_shape() {
        let issue = ValidationIssue::new(ValidationIssueKind::ValueBelowMinimum, "age")
            .with_context("minimum", 18.0)
            .with_context("count", 1);
        let value = serde_json::to_value(&issue).unwrap();

        assert_eq!(value["level"], json!("ERROR"));
        assert_eq!(value["kind"], json!("value_below_minimum"));
        assert_eq!(value["column"], json!("age"));
        assert_eq!(value["message"], json!("Values below minimum"));
        assert_eq!(value["context"]["count"], json!(1));
    }

    #[test]
    fn test_save_summary() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out").join("summary.json");
        save_summary(&report(), &dest).unwrap();

        let loaded: ValidationSummary =
            serde_json::from_str(&std::fs::read_to_string(&dest).unwrap()).unwrap();
        assert_eq!(loaded.error_count, 2);
        assert_eq!(loaded.warning_count, 1);
        assert_eq!(loaded.data_signature, "abc");
        assert_eq!(loaded.issues.len(), 3);
    }
}
