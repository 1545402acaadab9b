//! # datacert - dataset and artefact certification
//!
//! datacert audits a tabular dataset and the artefacts produced from it:
//!
//! - [`signature`]: deterministic SHA-256 fingerprints of datasets, files and
//!   directory trees
//! - [`schema`]: validation of a dataset against a declared schema, with an
//!   append-only audit log and a persisted summary
//! - [`charts`]: recomputation of chart aggregations from raw data, plus
//!   staleness detection through captured signatures
//! - [`manifest`]: per-run integrity manifests chained by hash
//! - [`certify`]: the end-to-end run tying the above together
//!
//! ## Quick Start
//!
//! ```no_run
//! use datacert::schema::{SchemaDefinition, ValidateOptions, validate_dataframe};
//! use datacert::frame::load_csv;
//! use std::path::Path;
//!
//! # fn example() -> datacert::error::Result<()> {
//! let df = load_csv(Path::new("survey.csv"))?;
//! let schema = SchemaDefinition::load(Path::new("schema.yaml"))?;
//!
//! let options = ValidateOptions { halt_on_error: false, ..Default::default() };
//! let report = validate_dataframe(&df, &schema, &options)?;
//! for issue in report.errors() {
//!     println!("{:?}: {}", issue.column, issue.message);
//! }
//!
//! // Thread this into chart specs so charts can later be checked for staleness.
//! println!("{}", report.data_signature);
//! # Ok(())
//! # }
//! ```
//!
//! ## Findings vs. errors
//!
//! Data-quality findings are collected as ERROR/WARN issues inside reports and
//! never returned as `Err`. Callers gate publication on `has_errors()`. The
//! only aggregate failure is [`error::CertError::ValidationFailed`], raised
//! when a caller opts into `halt_on_error`.

#![warn(clippy::all, rust_2018_idioms)]

pub mod audit;
pub mod certify;
pub mod charts;
pub mod config;
pub mod error;
pub mod frame;
pub mod issues;
pub mod logging;
pub mod manifest;
pub mod persist;
pub mod schema;
pub mod signature;
