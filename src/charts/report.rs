//! Chart issues and the chart validation report.

use crate::error::{Result, ResultExt as _};
use crate::issues::{Context, IssueLevel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// What a chart finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartIssueKind {
    ChartOutputMissing,
    UnsupportedAggregation,
    MissingAggregationSpec,
    CategoryMismatch,
    ValueMismatch,
    FabricatedXValue,
    UnsupportedChartKind,
    StaleChartSignature,
    /// The chart could not be recomputed (e.g. a referenced column is absent).
    RecomputationFailed,
}

impl ChartIssueKind {
    pub fn level(self) -> IssueLevel {
        match self {
            Self::UnsupportedChartKind => IssueLevel::Warn,
            _ => IssueLevel::Error,
        }
    }
}

/// A single chart finding, scoped to a chart identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartIssue {
    pub identifier: String,
    pub level: IssueLevel,
    pub kind: ChartIssueKind,
    pub message: String,
    #[serde(default)]
    pub context: Context,
}

impl ChartIssue {
    pub fn new(
        identifier: impl Into<String>,
        kind: ChartIssueKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            level: kind.level(),
            kind,
            message: message.into(),
            context: Context::new(),
        }
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_owned(), value.into());
        self
    }
}

/// Outcome of checking a set of charts against one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartValidationReport {
    pub issues: Vec<ChartIssue>,
    /// Signature of the dataset at check time, computed fresh.
    pub data_signature: String,
}

impl ChartValidationReport {
    /// True iff any ERROR is present. Gate publication on this.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.level == IssueLevel::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ChartIssue> {
        self.issues.iter().filter(|i| i.level == IssueLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ChartIssue> {
        self.issues.iter().filter(|i| i.level == IssueLevel::Warn)
    }

    pub fn issues_for<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a ChartIssue> {
        self.issues.iter().filter(move |i| i.identifier == identifier)
    }

    /// Write the report as pretty JSON: `{issues, data_signature}`.
    pub fn save(&self, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize chart report")?;
        std::fs::write(destination, json)
            .with_context(|| format!("Failed to write chart report to {}", destination.display()))
    }
}
