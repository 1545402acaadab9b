//! Chart specifications (chart provenance).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of chart. Unknown kinds are kept verbatim and reported as unverified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartKind {
    Bar,
    Line,
    Other(String),
}

impl From<String> for ChartKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "bar" => Self::Bar,
            "line" => Self::Line,
            _ => Self::Other(kind),
        }
    }
}

impl From<ChartKind> for String {
    fn from(kind: ChartKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bar => f.write_str("bar"),
            Self::Line => f.write_str("line"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// Aggregation applied per x category. Unknown names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Aggregation {
    Mean,
    Sum,
    Count,
    Other(String),
}

impl From<String> for Aggregation {
    fn from(aggregation: String) -> Self {
        match aggregation.as_str() {
            "mean" => Self::Mean,
            "sum" => Self::Sum,
            "count" => Self::Count,
            _ => Self::Other(aggregation),
        }
    }
}

impl From<Aggregation> for String {
    fn from(aggregation: Aggregation) -> Self {
        aggregation.to_string()
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => f.write_str("mean"),
            Self::Sum => f.write_str("sum"),
            Self::Count => f.write_str("count"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Row filter for one column: exact value, or membership when given a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    OneOf(Vec<Value>),
    Equals(Value),
}

impl FilterValue {
    pub fn accepts(&self, observed: &Value) -> bool {
        match self {
            Self::OneOf(values) => values
                .iter()
                .any(|v| crate::frame::values_match(observed, v)),
            Self::Equals(value) => crate::frame::values_match(observed, value),
        }
    }
}

/// Description of how a chart was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub identifier: String,
    pub kind: ChartKind,
    pub x: String,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub aggregation: Option<Aggregation>,
    #[serde(default)]
    pub filters: BTreeMap<String, FilterValue>,
    /// Data Signature of the dataset the chart was built from.
    #[serde(default)]
    pub data_signature: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ChartSpec {
    pub fn new(identifier: impl Into<String>, kind: ChartKind, x: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            x: x.into(),
            y: None,
            aggregation: None,
            filters: BTreeMap::new(),
            data_signature: None,
            created_at: None,
            metadata: Map::new(),
        }
    }

    pub fn with_y(mut self, y: impl Into<String>) -> Self {
        self.y = Some(y.into());
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, filter: FilterValue) -> Self {
        self.filters.insert(column.into(), filter);
        self
    }

    /// Stamp the spec with the signature of the dataset it is built from.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.data_signature = Some(signature.into());
        self
    }
}
