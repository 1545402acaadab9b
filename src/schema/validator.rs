//! The schema validation pass.
//!
//! Declared columns are checked in schema order; undeclared dataset columns
//! are reported afterwards, sorted by name. Issues are collected, never
//! raised one by one. Only the halt policy turns a report with errors into a
//! single aggregate [`CertError::ValidationFailed`], and only after the report
//! has been built and logged.

use super::audit_log::append_report;
use super::definition::{ColumnSchema, SchemaDefinition};
use super::dtype::{DeclaredDtype, infer_semantic_type};
use super::report::{ValidationIssue, ValidationIssueKind, ValidationReport};
use crate::error::{CertError, Result};
use crate::frame::{json_values, load_csv, sorted_distinct, values_match};
use crate::signature::dataset_signature;
use chrono::Utc;
use polars::prelude::*;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Caller policy for a validation run.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Append the report to this JSONL log when set.
    pub log_path: Option<PathBuf>,

    /// Fail with [`CertError::ValidationFailed`] when any ERROR is present.
    pub halt_on_error: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            log_path: None,
            halt_on_error: true,
        }
    }
}

/// Validate a dataframe against a schema.
///
/// # Errors
///
/// - [`CertError::ValidationFailed`] if `halt_on_error` is set and the report
///   contains errors (the report is carried inside the error).
/// - Polars or I/O errors if the data can't be inspected or the log can't be written.
pub fn validate_dataframe(
    df: &DataFrame,
    schema: &SchemaDefinition,
    options: &ValidateOptions,
) -> Result<ValidationReport> {
    let mut issues = Vec::new();
    let mut undeclared: BTreeSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    for col_schema in &schema.columns {
        undeclared.remove(&col_schema.name);

        let Ok(column) = df.column(&col_schema.name) else {
            let kind = if col_schema.required {
                ValidationIssueKind::MissingRequiredColumn
            } else {
                ValidationIssueKind::OptionalColumnMissing
            };
            issues.push(ValidationIssue::new(kind, &col_schema.name));
            continue;
        };

        check_column(col_schema, column.as_materialized_series(), &mut issues)?;
    }

    for extra in undeclared {
        issues.push(ValidationIssue::new(
            ValidationIssueKind::UnexpectedColumnPresent,
            extra,
        ));
    }

    let report = ValidationReport {
        issues,
        data_signature: dataset_signature(df)?,
        schema_version: schema.version.clone(),
        validated_at: Utc::now(),
    };

    if let Some(log_path) = &options.log_path {
        append_report(log_path, &report)?;
    }

    let error_count = report.errors().count();
    tracing::info!(
        "Validated {} rows x {} columns against schema {:?}: {} errors, {} warnings",
        df.height(),
        df.width(),
        report.schema_version,
        error_count,
        report.warnings().count()
    );

    if error_count > 0 {
        for issue in report.errors() {
            tracing::warn!("{:?}: {}", issue.column, issue.message);
        }

        if options.halt_on_error {
            return Err(CertError::ValidationFailed {
                error_count,
                report: Box::new(report),
            });
        }
    }

    Ok(report)
}

fn check_column(
    spec: &ColumnSchema,
    series: &Series,
    issues: &mut Vec<ValidationIssue>,
) -> Result<()> {
    let name = spec.name.as_str();
    let null_count = series.null_count();

    if !spec.nullable && null_count > 0 {
        issues.push(
            ValidationIssue::new(ValidationIssueKind::NullNotPermitted, name)
                .with_context("null_count", null_count),
        );
    }

    let observed = infer_semantic_type(series.dtype());
    match DeclaredDtype::parse(&spec.dtype) {
        // The dtype check is skipped so the bad declaration is reported once.
        None => issues.push(
            ValidationIssue::new(ValidationIssueKind::UnsupportedDtypeDeclaration, name)
                .with_message(format!("Unsupported dtype in schema: {}", spec.dtype))
                .with_context("declared", spec.dtype.as_str()),
        ),
        Some(declared) if !declared.accepts(observed) => issues.push(
            ValidationIssue::new(ValidationIssueKind::DtypeMismatch, name)
                .with_context("observed", observed.as_str())
                .with_context("expected", spec.dtype.as_str())
                .with_context("storage_dtype", series.dtype().to_string()),
        ),
        Some(_) => {}
    }

    if let Some(allowed) = &spec.allowed_values {
        let invalid: Vec<Value> = json_values(series)?
            .into_iter()
            .filter(|v| !v.is_null() && !allowed.iter().any(|a| values_match(v, a)))
            .collect();
        let invalid = sorted_distinct(invalid);

        if !invalid.is_empty() {
            issues.push(
                ValidationIssue::new(ValidationIssueKind::ValueOutsideAllowedSet, name)
                    .with_context("invalid_values", Value::Array(invalid)),
            );
        }
    }

    if spec.minimum.is_some() || spec.maximum.is_some() {
        if observed.is_numeric() {
            check_range(spec, series, issues)?;
        } else if null_count < series.len() {
            issues.push(
                ValidationIssue::new(ValidationIssueKind::RangeOnNonNumericColumn, name)
                    .with_context("observed", observed.as_str()),
            );
        }
    }

    Ok(())
}

fn check_range(
    spec: &ColumnSchema,
    series: &Series,
    issues: &mut Vec<ValidationIssue>,
) -> Result<()> {
    let floats = series.cast(&DataType::Float64)?;
    let ca = floats.f64()?;

    if let Some(minimum) = spec.minimum {
        let count = ca.into_iter().flatten().filter(|v| *v < minimum).count();
        if count > 0 {
            issues.push(
                ValidationIssue::new(ValidationIssueKind::ValueBelowMinimum, &spec.name)
                    .with_context("minimum", minimum)
                    .with_context("count", count),
            );
        }
    }

    if let Some(maximum) = spec.maximum {
        let count = ca.into_iter().flatten().filter(|v| *v > maximum).count();
        if count > 0 {
            issues.push(
                ValidationIssue::new(ValidationIssueKind::ValueAboveMaximum, &spec.name)
                    .with_context("maximum", maximum)
                    .with_context("count", count),
            );
        }
    }

    Ok(())
}

/// Load a CSV and a schema file, then validate in one go.
pub fn validate_csv(
    csv_path: &Path,
    schema_path: &Path,
    options: &ValidateOptions,
) -> Result<(DataFrame, ValidationReport)> {
    let df = load_csv(csv_path)?;
    let schema = SchemaDefinition::load(schema_path)?;
    let report = validate_dataframe(&df, &schema, options)?;
    Ok((df, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::IssueLevel;
    use serde_json::json;
    use tempfile::TempDir;

    fn no_halt() -> ValidateOptions {
        ValidateOptions {
            log_path: None,
            halt_on_error: false,
        }
    }

    fn kinds(report: &ValidationReport) -> Vec<ValidationIssueKind> {
        report.issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_clean_dataset_with_log() {
        let temp_dir = TempDir::new().unwrap();
        let df = df! {
            "respondent_id" => [1i64, 2],
            "age" => [30i64, 28],
        }
        .unwrap();
        let schema = SchemaDefinition::new(vec![
            ColumnSchema::new("respondent_id", "integer").non_nullable(),
            ColumnSchema::new("age", "number")
                .with_minimum(18.0)
                .with_maximum(99.0),
            ColumnSchema::new("segment", "string").optional(),
        ]);

        let log_path = temp_dir.path().join("validation.jsonl");
        let options = ValidateOptions {
            log_path: Some(log_path.clone()),
            halt_on_error: false,
        };
        let report = validate_dataframe(&df, &schema, &options).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        let entry: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(entry["data_signature"], json!(report.data_signature));

        assert_eq!(report.warnings().count(), 1);
        assert!(!report.has_errors());
        assert_eq!(kinds(&report), vec![ValidationIssueKind::OptionalColumnMissing]);
    }

    #[test]
    fn test_missing_required_column_halts() {
        let df = df! { "x" => [1i64] }.unwrap();
        let schema = SchemaDefinition::new(vec![ColumnSchema::new("id", "integer")]);

        let err = validate_dataframe(&df, &schema, &ValidateOptions::default()).unwrap_err();
        match err {
            CertError::ValidationFailed {
                error_count,
                report,
            } => {
                assert_eq!(error_count, 1);
                assert_eq!(report.errors().count(), 1);
            }
            other => panic!("expected ValidationFailed, got {other}"),
        }
    }

    #[test]
    fn test_missing_required_column_without_halt() {
        let df = df! { "x" => [1i64] }.unwrap();
        let schema = SchemaDefinition::new(vec![ColumnSchema::new("id", "integer")]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        let errors: Vec<_> = report.errors().collect();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column.as_deref(), Some("id"));
        assert_eq!(errors[0].kind, ValidationIssueKind::MissingRequiredColumn);
        // "x" is not declared.
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_halt_still_writes_log() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("log.jsonl");
        let df = df! { "age" => [34i64] }.unwrap();
        let schema = SchemaDefinition::new(vec![ColumnSchema::new("respondent_id", "integer")]);

        let options = ValidateOptions {
            log_path: Some(log_path.clone()),
            halt_on_error: true,
        };
        assert!(validate_dataframe(&df, &schema, &options).is_err());
        assert_eq!(std::fs::read_to_string(&log_path).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_minimum_violation_context() {
        let df = df! { "age" => [30i64, 15] }.unwrap();
        let schema =
            SchemaDefinition::new(vec![ColumnSchema::new("age", "number").with_minimum(18.0)]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        let errors: Vec<_> = report.errors().collect();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationIssueKind::ValueBelowMinimum);
        assert_eq!(errors[0].context["minimum"].as_f64(), Some(18.0));
        assert_eq!(errors[0].context["count"], json!(1));
    }

    #[test]
    fn test_minimum_and_maximum_reported_independently() {
        let df = df! { "score" => [Some(0.5f64), Some(11.0), None, Some(5.0)] }.unwrap();
        let schema = SchemaDefinition::new(vec![
            ColumnSchema::new("score", "float")
                .with_minimum(1.0)
                .with_maximum(10.0),
        ]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(
            kinds(&report),
            vec![
                ValidationIssueKind::ValueBelowMinimum,
                ValidationIssueKind::ValueAboveMaximum
            ]
        );
    }

    #[test]
    fn test_nulls_not_permitted() {
        let df = df! { "id" => [Some(1i64), None, None] }.unwrap();
        let schema =
            SchemaDefinition::new(vec![ColumnSchema::new("id", "integer").non_nullable()]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(kinds(&report), vec![ValidationIssueKind::NullNotPermitted]);
        assert_eq!(report.issues[0].context["null_count"], json!(2));
    }

    #[test]
    fn test_dtype_mismatch_context() {
        let df = df! { "age" => ["thirty", "forty"] }.unwrap();
        let schema = SchemaDefinition::new(vec![ColumnSchema::new("age", "integer")]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(kinds(&report), vec![ValidationIssueKind::DtypeMismatch]);
        assert_eq!(report.issues[0].context["observed"], json!("string"));
        assert_eq!(report.issues[0].context["expected"], json!("integer"));
    }

    #[test]
    fn test_unsupported_dtype_reported_once() {
        let df = df! { "amount" => [1.5f64] }.unwrap();
        let schema = SchemaDefinition::new(vec![ColumnSchema::new("amount", "decimal")]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(
            kinds(&report),
            vec![ValidationIssueKind::UnsupportedDtypeDeclaration]
        );
        assert!(report.issues[0].message.contains("decimal"));
    }

    #[test]
    fn test_allowed_values_sorted_and_deduplicated() {
        let df = df! {
            "segment" => [Some("A"), Some("Z"), Some("B"), Some("Z"), None, Some("C")],
        }
        .unwrap();
        let schema = SchemaDefinition::new(vec![
            ColumnSchema::new("segment", "string").with_allowed_values(vec![json!("A"), json!("B")]),
        ]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(kinds(&report), vec![ValidationIssueKind::ValueOutsideAllowedSet]);
        assert_eq!(
            report.issues[0].context["invalid_values"],
            json!(["C", "Z"])
        );
    }

    #[test]
    fn test_allowed_numeric_values() {
        let df = df! { "rating" => [1i64, 2, 5] }.unwrap();
        let schema = SchemaDefinition::new(vec![
            ColumnSchema::new("rating", "integer")
                .with_allowed_values(vec![json!(1), json!(2.0), json!(3)]),
        ]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].context["invalid_values"], json!([5]));
    }

    #[test]
    fn test_allowed_values_keep_large_integers_apart() {
        let df = df! { "account" => [9_007_199_254_740_993i64] }.unwrap();
        let schema = SchemaDefinition::new(vec![
            ColumnSchema::new("account", "integer")
                .with_allowed_values(vec![json!(9_007_199_254_740_992i64)]),
        ]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(kinds(&report), vec![ValidationIssueKind::ValueOutsideAllowedSet]);
        assert_eq!(
            report.issues[0].context["invalid_values"],
            json!([9_007_199_254_740_993i64])
        );
    }

    #[test]
    fn test_boolean_and_category_columns_pass() {
        let df = df! {
            "consented" => [true, false],
            "tier" => ["gold", "silver"],
        }
        .unwrap()
        .lazy()
        .with_column(col("tier").cast(DataType::Categorical(None, CategoricalOrdering::Physical)))
        .collect()
        .unwrap();
        let schema = SchemaDefinition::new(vec![
            ColumnSchema::new("consented", "boolean").non_nullable(),
            ColumnSchema::new("tier", "category")
                .with_allowed_values(vec![json!("gold"), json!("silver")]),
        ]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_datetime_columns_from_csv_pass() {
        let temp_dir = TempDir::new().unwrap();
        let csv = temp_dir.path().join("visits.csv");
        std::fs::write(
            &csv,
            "visited_at,visit_day,returning\n2024-01-01 10:00:00,2024-01-01,true\n2024-01-02 11:30:00,2024-01-02,false\n",
        )
        .unwrap();
        let schema = temp_dir.path().join("schema.yaml");
        std::fs::write(
            &schema,
            "columns:\n  - name: visited_at\n    dtype: datetime\n  - name: visit_day\n    dtype: datetime\n  - name: returning\n    dtype: boolean\n",
        )
        .unwrap();

        let (_, report) = validate_csv(&csv, &schema, &no_halt()).unwrap();
        assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_range_on_text_column() {
        let df = df! { "age" => ["old"] }.unwrap();
        let schema =
            SchemaDefinition::new(vec![ColumnSchema::new("age", "string").with_minimum(18.0)]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(
            kinds(&report),
            vec![ValidationIssueKind::RangeOnNonNumericColumn]
        );
    }

    #[test]
    fn test_unexpected_columns_sorted_after_declared() {
        let df = df! {
            "zeta" => [1i64],
            "id" => [1i64],
            "alpha" => [1i64],
        }
        .unwrap();
        let schema = SchemaDefinition::new(vec![
            ColumnSchema::new("id", "integer"),
            ColumnSchema::new("missing", "string").optional(),
        ]);

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        let columns: Vec<_> = report
            .issues
            .iter()
            .map(|i| (i.column.clone().unwrap(), i.level))
            .collect();

        assert_eq!(
            columns,
            vec![
                ("missing".to_owned(), IssueLevel::Warn),
                ("alpha".to_owned(), IssueLevel::Warn),
                ("zeta".to_owned(), IssueLevel::Warn),
            ]
        );
    }

    #[test]
    fn test_report_carries_signature_and_version() {
        let df = df! { "id" => [1i64, 2] }.unwrap();
        let schema =
            SchemaDefinition::new(vec![ColumnSchema::new("id", "integer")]).with_version("7");

        let report = validate_dataframe(&df, &schema, &no_halt()).unwrap();
        assert_eq!(report.schema_version.as_deref(), Some("7"));
        assert_eq!(report.data_signature, dataset_signature(&df).unwrap());
    }

    #[test]
    fn test_validate_csv() {
        let temp_dir = TempDir::new().unwrap();
        let csv = temp_dir.path().join("survey.csv");
        std::fs::write(&csv, "respondent_id,age\n1,30\n2,17\n").unwrap();
        let schema = temp_dir.path().join("schema.yaml");
        std::fs::write(
            &schema,
            "version: \"1\"\ncolumns:\n  - name: respondent_id\n    dtype: integer\n  - name: age\n    dtype: number\n    minimum: 18\n",
        )
        .unwrap();

        let (df, report) = validate_csv(&csv, &schema, &no_halt()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(kinds(&report), vec![ValidationIssueKind::ValueBelowMinimum]);
    }
}
