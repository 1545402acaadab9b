//! Schema validation.
//!
//! Checks a dataset against a declared [`SchemaDefinition`] and produces a
//! [`ValidationReport`] that embeds the dataset's Data Signature. The report
//! is the handoff point to the rest of the pipeline: its `data_signature` is
//! the value chart authors stamp into their specs so staleness can be
//! detected later.
//!
//! ```no_run
//! use datacert::schema::{SchemaDefinition, ValidateOptions, validate_dataframe};
//! use polars::prelude::*;
//! use std::path::Path;
//!
//! # fn example() -> datacert::error::Result<()> {
//! let schema = SchemaDefinition::load(Path::new("schema.yaml"))?;
//! let df = df! { "respondent_id" => [1i64, 2], "age" => [30i64, 28] }?;
//!
//! let options = ValidateOptions {
//!     log_path: Some("outputs/validation.jsonl".into()),
//!     halt_on_error: false,
//! };
//! let report = validate_dataframe(&df, &schema, &options)?;
//! println!("{} errors, {} warnings", report.errors().count(), report.warnings().count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Submodules
//!
//! - [`definition`]: schema documents (YAML or JSON)
//! - [`dtype`]: declared dtypes and semantic type inference
//! - [`report`]: issues, reports and the summary document
//! - [`validator`]: the validation pass and halt policy
//! - [`audit_log`]: append-only validation log

pub mod audit_log;
pub mod definition;
pub mod dtype;
pub mod report;
pub mod validator;

pub use audit_log::append_report;
pub use definition::{ColumnSchema, SchemaDefinition};
pub use dtype::{DeclaredDtype, SemanticType, infer_semantic_type};
pub use report::{
    ValidationIssue, ValidationIssueKind, ValidationReport, ValidationSummary, save_summary,
};
pub use validator::{ValidateOptions, validate_csv, validate_dataframe};
