//! Recompute charts from raw data and compare with their materialized output.

use super::report::{ChartIssue, ChartIssueKind, ChartValidationReport};
use super::spec::{Aggregation, ChartKind, ChartSpec};
use crate::error::{CertError, Result};
use crate::frame::{json_values, value_key};
use crate::signature::dataset_signature;
use polars::prelude::*;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Absolute tolerance for aggregated values.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Checks materialized charts against the dataset they claim to summarise.
#[derive(Debug, Clone, Copy)]
pub struct ChartChecker {
    tolerance: f64,
}

impl Default for ChartChecker {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ChartChecker {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Check every spec against its materialized output in `charts`.
    ///
    /// Data-quality findings are returned as issues in the report; the
    /// report's signature is always computed fresh from `df`.
    ///
    /// # Errors
    ///
    /// [`CertError::UnknownFilterColumn`] when a spec filters on a column the
    /// dataset does not have, which is a misconfigured spec rather than a
    /// finding. Also fails if the dataset cannot be rendered for its signature.
    pub fn validate(
        &self,
        df: &DataFrame,
        specs: &[ChartSpec],
        charts: &HashMap<String, DataFrame>,
    ) -> Result<ChartValidationReport> {
        let data_signature = dataset_signature(df)?;
        let mut issues = Vec::new();

        for spec in specs {
            let Some(chart) = charts.get(&spec.identifier) else {
                issues.push(ChartIssue::new(
                    &spec.identifier,
                    ChartIssueKind::ChartOutputMissing,
                    "Chart output missing.",
                ));
                continue;
            };

            if let Some(issue) = self.verify_chart(df, spec, chart)? {
                issues.push(issue);
            }

            if let Some(captured) = &spec.data_signature
                && *captured != data_signature
            {
                issues.push(
                    ChartIssue::new(
                        &spec.identifier,
                        ChartIssueKind::StaleChartSignature,
                        "Chart is stale relative to the dataset signature.",
                    )
                    .with_context("chart_signature", captured.as_str())
                    .with_context("data_signature", data_signature.as_str()),
                );
            }
        }

        let report = ChartValidationReport {
            issues,
            data_signature,
        };

        tracing::info!(
            "Checked {} charts: {} errors, {} warnings",
            specs.len(),
            report.errors().count(),
            report.warnings().count()
        );
        for issue in report.errors() {
            tracing::warn!("Chart '{}': {}", issue.identifier, issue.message);
        }

        Ok(report)
    }

    /// Check one chart's arithmetic. Staleness is handled by the caller.
    fn verify_chart(
        &self,
        df: &DataFrame,
        spec: &ChartSpec,
        chart: &DataFrame,
    ) -> Result<Option<ChartIssue>> {
        let filtered = apply_filters(df, spec)?;

        let outcome = match &spec.kind {
            ChartKind::Bar => self.verify_bar(&filtered, spec, chart),
            ChartKind::Line => verify_line(&filtered, spec, chart),
            ChartKind::Other(kind) => Ok(Some(ChartIssue::new(
                &spec.identifier,
                ChartIssueKind::UnsupportedChartKind,
                format!("No validator registered for chart kind: {kind}"),
            ))),
        };

        Ok(outcome.unwrap_or_else(|e| {
            Some(
                ChartIssue::new(
                    &spec.identifier,
                    ChartIssueKind::RecomputationFailed,
                    "Chart could not be recomputed from the dataset.",
                )
                .with_context("error", e.to_string()),
            )
        }))
    }

    fn verify_bar(
        &self,
        filtered: &DataFrame,
        spec: &ChartSpec,
        chart: &DataFrame,
    ) -> PolarsResult<Option<ChartIssue>> {
        let id = spec.identifier.as_str();
        let (Some(y), Some(aggregation)) = (spec.y.as_deref(), spec.aggregation.as_ref()) else {
            return Ok(Some(ChartIssue::new(
                id,
                ChartIssueKind::MissingAggregationSpec,
                "Bar charts must define 'y' and 'aggregation'.",
            )));
        };

        let aggregated = match aggregation {
            Aggregation::Mean => col(y).mean(),
            Aggregation::Sum => col(y).sum(),
            Aggregation::Count => col(y).count(),
            Aggregation::Other(name) => {
                return Ok(Some(
                    ChartIssue::new(
                        id,
                        ChartIssueKind::UnsupportedAggregation,
                        format!("Unsupported aggregation: {name}"),
                    )
                    .with_context("aggregation", name.as_str()),
                ));
            }
        };

        let x = spec.x.as_str();
        // Null categories are dropped before grouping, for every aggregation.
        let expected = with_label_categories(filtered, x)?
            .lazy()
            .filter(col(x).is_not_null())
            .group_by([col(x)])
            .agg([aggregated.alias(y)])
            .sort_by_exprs([col(x)], SortMultipleOptions::default())
            .collect()?;

        let observed = with_label_categories(chart, x)?
            .lazy()
            .select([col(x), col(y)])
            .sort_by_exprs([col(x)], SortMultipleOptions::default())
            .collect()?;

        let expected_x = json_values(expected.column(x)?.as_materialized_series())?;
        let observed_x = json_values(observed.column(x)?.as_materialized_series())?;

        let categories_match = expected_x.len() == observed_x.len()
            && expected_x
                .iter()
                .zip(&observed_x)
                .all(|(e, o)| value_key(e) == value_key(o));

        if !categories_match {
            return Ok(Some(
                ChartIssue::new(
                    id,
                    ChartIssueKind::CategoryMismatch,
                    "Category mismatch between chart and data.",
                )
                .with_context("expected", Value::Array(expected_x))
                .with_context("observed", Value::Array(observed_x)),
            ));
        }

        let expected_y = float_values(expected.column(y)?)?;
        let observed_y = float_values(observed.column(y)?)?;

        let max_delta = expected_y
            .iter()
            .zip(&observed_y)
            // One-sided NaN never reaches the fold, where `f64::max` would drop it.
            .map(|pair| match pair {
                (Some(e), Some(o)) if e == o || (e.is_nan() && o.is_nan()) => 0.0,
                (Some(e), Some(o)) => {
                    let delta = (e - o).abs();
                    if delta.is_nan() {
                        f64::INFINITY
                    } else {
                        delta
                    }
                }
                (None, None) => 0.0,
                _ => f64::INFINITY,
            })
            .fold(0.0, f64::max);

        if max_delta > self.tolerance {
            return Ok(Some(
                ChartIssue::new(
                    id,
                    ChartIssueKind::ValueMismatch,
                    "Aggregated values differ from data.",
                )
                .with_context("max_delta", max_delta)
                .with_context("tolerance", self.tolerance),
            ));
        }

        Ok(None)
    }
}

/// Every x value plotted must exist in the filtered data.
///
/// This guards against fabricated or cherry-picked points; it does not check
/// y values.
fn verify_line(
    filtered: &DataFrame,
    spec: &ChartSpec,
    chart: &DataFrame,
) -> PolarsResult<Option<ChartIssue>> {
    let x = spec.x.as_str();

    let available: HashSet<String> = json_values(filtered.column(x)?.as_materialized_series())?
        .iter()
        .map(value_key)
        .collect();

    let fabricated: Vec<Value> = json_values(chart.column(x)?.as_materialized_series())?
        .into_iter()
        .filter(|v| !available.contains(&value_key(v)))
        .collect();

    if fabricated.is_empty() {
        return Ok(None);
    }

    Ok(Some(
        ChartIssue::new(
            &spec.identifier,
            ChartIssueKind::FabricatedXValue,
            "Chart includes x-values that do not exist in the dataset.",
        )
        .with_context("values", Value::Array(fabricated)),
    ))
}

/// Categorical x columns sort by their labels, not by encoding order.
fn with_label_categories(df: &DataFrame, x: &str) -> PolarsResult<DataFrame> {
    match df.column(x)?.dtype() {
        DataType::Categorical(..) | DataType::Enum(..) => df
            .clone()
            .lazy()
            .with_column(col(x).cast(DataType::String))
            .collect(),
        _ => Ok(df.clone()),
    }
}

fn float_values(column: &Column) -> PolarsResult<Vec<Option<f64>>> {
    let floats = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Apply a spec's filters to the dataset.
fn apply_filters(df: &DataFrame, spec: &ChartSpec) -> Result<DataFrame> {
    if spec.filters.is_empty() {
        return Ok(df.clone());
    }

    let mut mask = vec![true; df.height()];
    for (column, filter) in &spec.filters {
        let Ok(series) = df.column(column) else {
            return Err(CertError::UnknownFilterColumn {
                identifier: spec.identifier.clone(),
                column: column.clone(),
            });
        };

        let values = json_values(series.as_materialized_series())?;
        for (keep, value) in mask.iter_mut().zip(&values) {
            *keep = *keep && filter.accepts(value);
        }
    }

    let mask = BooleanChunked::new("filter".into(), mask);
    Ok(df.filter(&mask)?)
}

/// Check charts with the default tolerance.
pub fn validate_charts(
    df: &DataFrame,
    specs: &[ChartSpec],
    charts: &HashMap<String, DataFrame>,
) -> Result<ChartValidationReport> {
    ChartChecker::default().validate(df, specs, charts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::spec::FilterValue;
    use serde_json::json;

    fn survey() -> DataFrame {
        df! {
            "segment" => ["A", "A", "B"],
            "satisfaction" => [4i64, 5, 3],
        }
        .unwrap()
    }

    fn mean_spec(id: &str) -> ChartSpec {
        ChartSpec::new(id, ChartKind::Bar, "segment")
            .with_y("satisfaction")
            .with_aggregation(Aggregation::Mean)
    }

    fn true_means() -> DataFrame {
        // Deliberately unsorted: comparison sorts by x first.
        df! {
            "segment" => ["B", "A"],
            "satisfaction" => [3.0f64, 4.5],
        }
        .unwrap()
    }

    fn charts(id: &str, chart: DataFrame) -> HashMap<String, DataFrame> {
        HashMap::from([(id.to_owned(), chart)])
    }

    fn kinds(report: &ChartValidationReport) -> Vec<ChartIssueKind> {
        report.issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_happy_path() {
        let df = survey();
        let spec = mean_spec("fresh_chart").with_signature(dataset_signature(&df).unwrap());

        let report = validate_charts(&df, &[spec], &charts("fresh_chart", true_means())).unwrap();

        assert!(!report.has_errors(), "unexpected issues: {:?}", report.issues);
        assert!(report.issues.is_empty());
        assert_eq!(report.data_signature, dataset_signature(&df).unwrap());
    }

    #[test]
    fn test_stale_signature_flagged_even_when_values_match() {
        let df = survey();
        let spec = mean_spec("stale_chart").with_signature("old_signature");

        let report = validate_charts(&df, &[spec], &charts("stale_chart", true_means())).unwrap();

        assert!(report.has_errors());
        assert_eq!(kinds(&report), vec![ChartIssueKind::StaleChartSignature]);

        let issue = &report.issues[0];
        assert!(issue.message.starts_with("Chart is stale"));
        assert_eq!(issue.context["chart_signature"], json!("old_signature"));
        assert_eq!(issue.context["data_signature"], json!(report.data_signature));
    }

    #[test]
    fn test_missing_output_skips_other_checks() {
        let df = survey();
        let spec = mean_spec("absent").with_signature("old_signature");

        let report = validate_charts(&df, &[spec], &HashMap::new()).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::ChartOutputMissing]);
    }

    #[test]
    fn test_bar_requires_y_and_aggregation() {
        let df = survey();
        let spec = ChartSpec::new("no_agg", ChartKind::Bar, "segment").with_y("satisfaction");

        let report = validate_charts(&df, &[spec], &charts("no_agg", true_means())).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::MissingAggregationSpec]);
    }

    #[test]
    fn test_unsupported_aggregation() {
        let df = survey();
        let spec = ChartSpec::new("median", ChartKind::Bar, "segment")
            .with_y("satisfaction")
            .with_aggregation(Aggregation::Other("median".to_owned()));

        let report = validate_charts(&df, &[spec], &charts("median", true_means())).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::UnsupportedAggregation]);
        assert!(report.issues[0].message.contains("median"));
    }

    #[test]
    fn test_category_mismatch() {
        let df = survey();
        let chart = df! {
            "segment" => ["A"],
            "satisfaction" => [4.5f64],
        }
        .unwrap();

        let report = validate_charts(&df, &[mean_spec("c")], &charts("c", chart)).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::CategoryMismatch]);
        assert_eq!(report.issues[0].context["expected"], json!(["A", "B"]));
        assert_eq!(report.issues[0].context["observed"], json!(["A"]));
    }

    #[test]
    fn test_value_mismatch_reports_max_delta() {
        let df = survey();
        let chart = df! {
            "segment" => ["A", "B"],
            "satisfaction" => [4.0f64, 3.0],
        }
        .unwrap();

        let report = validate_charts(&df, &[mean_spec("v")], &charts("v", chart)).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::ValueMismatch]);
        let delta = report.issues[0].context["max_delta"].as_f64().unwrap();
        assert!((delta - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nan_chart_value_is_a_mismatch() {
        let df = survey();
        let chart = df! {
            "segment" => ["A", "B"],
            "satisfaction" => [f64::NAN, 3.0],
        }
        .unwrap();

        let report = validate_charts(&df, &[mean_spec("nan")], &charts("nan", chart)).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::ValueMismatch]);
        assert!(report.has_errors());
    }

    #[test]
    fn test_categorical_x_compares_by_label() {
        // Encoding order is B then A, so physical order disagrees with labels.
        let df = df! {
            "segment" => ["B", "A", "A"],
            "satisfaction" => [3i64, 4, 5],
        }
        .unwrap()
        .lazy()
        .with_column(
            col("segment").cast(DataType::Categorical(None, CategoricalOrdering::Physical)),
        )
        .collect()
        .unwrap();

        let chart = df! {
            "segment" => ["A", "B"],
            "satisfaction" => [4.5f64, 3.0],
        }
        .unwrap();

        let report = validate_charts(&df, &[mean_spec("cat")], &charts("cat", chart)).unwrap();
        assert!(!report.has_errors(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_values_within_tolerance_pass() {
        let df = survey();
        let chart = df! {
            "segment" => ["A", "B"],
            "satisfaction" => [4.500_000_1f64, 3.0],
        }
        .unwrap();

        let report = validate_charts(&df, &[mean_spec("t")], &charts("t", chart.clone())).unwrap();
        assert!(!report.has_errors());

        let strict = ChartChecker::new(1e-9)
            .validate(&df, &[mean_spec("t")], &charts("t", chart))
            .unwrap();
        assert_eq!(kinds(&strict), vec![ChartIssueKind::ValueMismatch]);
    }

    #[test]
    fn test_sum_with_filter() {
        let df = df! {
            "segment" => ["A", "A", "B", "B"],
            "wave" => [1i64, 2, 1, 2],
            "spend" => [10i64, 20, 30, 40],
        }
        .unwrap();
        let spec = ChartSpec::new("spend_w1", ChartKind::Bar, "segment")
            .with_y("spend")
            .with_aggregation(Aggregation::Sum)
            .with_filter("wave", FilterValue::Equals(json!(1)));
        let chart = df! {
            "segment" => ["A", "B"],
            "spend" => [10i64, 30],
        }
        .unwrap();

        let report = validate_charts(&df, &[spec], &charts("spend_w1", chart)).unwrap();
        assert!(!report.has_errors(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_count_drops_null_categories_and_values() {
        let df = df! {
            "segment" => [Some("A"), Some("A"), None, Some("B")],
            "score" => [Some(1i64), None, Some(3), Some(4)],
        }
        .unwrap();
        let spec = ChartSpec::new("n", ChartKind::Bar, "segment")
            .with_y("score")
            .with_aggregation(Aggregation::Count)
            .with_filter("segment", FilterValue::OneOf(vec![json!("A"), json!("B")]));
        let chart = df! {
            "segment" => ["A", "B"],
            "score" => [1i64, 1],
        }
        .unwrap();

        let report = validate_charts(&df, &[spec], &charts("n", chart)).unwrap();
        assert!(!report.has_errors(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_unknown_filter_column_is_propagated() {
        let df = survey();
        let spec = mean_spec("f").with_filter("region", FilterValue::Equals(json!("north")));

        let err = validate_charts(&df, &[spec], &charts("f", true_means())).unwrap_err();
        assert!(matches!(
            err,
            CertError::UnknownFilterColumn { ref column, .. } if column == "region"
        ));
    }

    #[test]
    fn test_line_rejects_fabricated_x_values() {
        let df = df! {
            "week" => [1i64, 2, 3],
            "nps" => [10.0f64, 12.0, 11.0],
        }
        .unwrap();
        let spec = ChartSpec::new("trend", ChartKind::Line, "week").with_y("nps");

        let honest = df! { "week" => [1i64, 3], "nps" => [10.0f64, 11.0] }.unwrap();
        let report = validate_charts(&df, &[spec.clone()], &charts("trend", honest)).unwrap();
        assert!(!report.has_errors());

        let padded = df! { "week" => [1i64, 4, 5], "nps" => [10.0f64, 99.0, 98.0] }.unwrap();
        let report = validate_charts(&df, &[spec], &charts("trend", padded)).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::FabricatedXValue]);
        assert_eq!(report.issues[0].context["values"], json!([4, 5]));
    }

    #[test]
    fn test_unknown_kind_is_a_warning() {
        let df = survey();
        let spec = ChartSpec::new("pie", ChartKind::Other("pie".to_owned()), "segment");

        let report = validate_charts(&df, &[spec], &charts("pie", true_means())).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::UnsupportedChartKind]);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_missing_chart_column_is_recomputation_failure() {
        let df = survey();
        let chart = df! { "segment" => ["A", "B"] }.unwrap();

        let report = validate_charts(&df, &[mean_spec("broken")], &charts("broken", chart)).unwrap();
        assert_eq!(kinds(&report), vec![ChartIssueKind::RecomputationFailed]);
        assert!(report.has_errors());
    }
}
