//! Centralized error handling for datacert.
//!
//! Data-quality findings are never errors: they are collected as issues inside
//! a [`ValidationReport`](crate::schema::ValidationReport) or a
//! [`ChartValidationReport`](crate::charts::ChartValidationReport). The
//! variants below cover the cases where an operation genuinely cannot
//! proceed, plus the single aggregate failure a caller may opt into with
//! `halt_on_error`.
//!
//! ```no_run
//! use datacert::error::{CertError, Result, ResultExt as _};
//!
//! fn read_schema(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).context("Failed to read schema")
//! }
//!
//! match read_schema("schema.yaml") {
//!     Err(CertError::ValidationFailed { error_count, .. }) => eprintln!("{error_count} errors"),
//!     Err(e) => eprintln!("{e}"),
//!     Ok(_) => {}
//! }
//! ```

use crate::schema::ValidationReport;
use std::fmt;

/// Main error type for datacert operations.
#[derive(Debug)]
pub enum CertError {
    /// I/O errors (file operations)
    Io(std::io::Error),

    /// Data processing errors (Polars, parsing, etc.)
    DataProcessing(String),

    /// Configuration errors (malformed config or JSON documents)
    Config(String),

    /// Schema document could not be parsed
    Schema(String),

    /// File not found or invalid path
    InvalidPath(String),

    /// A chart spec filters on a column the dataset does not have.
    UnknownFilterColumn { identifier: String, column: String },

    /// Validation produced errors and the caller asked to halt on them.
    ValidationFailed {
        error_count: usize,
        report: Box<ValidationReport>,
    },

    /// Generic error with context
    Other(String),
}

impl fmt::Display for CertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Schema(msg) => write!(f, "Schema error: {msg}"),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {msg}"),
            Self::UnknownFilterColumn { identifier, column } => {
                write!(f, "Chart '{identifier}': filter column not found: {column}")
            }
            Self::ValidationFailed { error_count, .. } => {
                write!(f, "Validation failed with {error_count} error(s)")
            }
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CertError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for CertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<serde_yaml::Error> for CertError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(format!("YAML error: {err}"))
    }
}

impl From<polars::error::PolarsError> for CertError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<walkdir::Error> for CertError {
    fn from(err: walkdir::Error) -> Self {
        match err.into_io_error() {
            Some(io) => Self::Io(io),
            None => Self::Other("Filesystem loop detected while walking directory".to_owned()),
        }
    }
}

/// Result type alias for datacert operations.
pub type Result<T> = std::result::Result<T, CertError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CertError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: CertError = e.into();
            CertError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: CertError = e.into();
            CertError::Other(format!("{}: {}", f(), err))
        })
    }
}
