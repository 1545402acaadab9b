//! Chart consistency checking.
//!
//! Rendered charts are only trustworthy if they can be reproduced from the
//! data they claim to summarise. For every [`ChartSpec`] the checker
//! re-applies the spec's filters to the raw dataset, recomputes the
//! aggregation and compares it with the materialized chart output. It also
//! compares each spec's captured Data Signature with the current dataset's
//! signature, so a chart built from an older dataset is flagged as stale
//! even when its arithmetic is internally correct.
//!
//! ```no_run
//! use datacert::charts::{ChartSpec, ChartKind, Aggregation, validate_charts};
//! use polars::prelude::*;
//! use std::collections::HashMap;
//!
//! # fn example() -> datacert::error::Result<()> {
//! let df = df! { "segment" => ["A", "A", "B"], "score" => [4i64, 5, 3] }?;
//! let chart = df! { "segment" => ["A", "B"], "score" => [4.5f64, 3.0] }?;
//!
//! let spec = ChartSpec::new("score_by_segment", ChartKind::Bar, "segment")
//!     .with_y("score")
//!     .with_aggregation(Aggregation::Mean);
//! let charts = HashMap::from([("score_by_segment".to_owned(), chart)]);
//!
//! let report = validate_charts(&df, &[spec], &charts)?;
//! if report.has_errors() {
//!     // block publication
//! }
//! # Ok(())
//! # }
//! ```

pub mod checker;
pub mod metadata;
pub mod report;
pub mod spec;

pub use checker::{ChartChecker, DEFAULT_TOLERANCE, validate_charts};
pub use metadata::{
    load_chart_metadata, load_chart_specs, load_materialized_charts, save_chart_metadata,
};
pub use report::{ChartIssue, ChartIssueKind, ChartValidationReport};
pub use spec::{Aggregation, ChartKind, ChartSpec, FilterValue};
