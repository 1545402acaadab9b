//! Severity levels shared by schema and chart findings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured key-value data attached to an issue (counts, thresholds, offending values).
pub type Context = Map<String, Value>;

/// Severity of a finding.
///
/// `Error` blocks (or flags) publication under caller policy; `Warn` is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueLevel {
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "WARN")]
    Warn,
}

impl IssueLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
        }
    }
}

impl std::fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
