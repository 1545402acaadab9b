//! Declared dtypes and semantic type inference.
//!
//! A column's polars `DataType` is reduced to a [`SemanticType`] by one
//! explicit match, and a schema's dtype string is parsed into a
//! [`DeclaredDtype`]. Compatibility is then a plain enum comparison.

use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type observed on a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Integer,
    Float,
    String,
    Boolean,
    Datetime,
    Category,
    /// Nested, binary, null-typed, time-of-day and duration columns.
    Other,
}

impl SemanticType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Category => "category",
            Self::Other => "other",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduce a polars dtype to its semantic type.
pub fn infer_semantic_type(dtype: &DataType) -> SemanticType {
    match dtype {
        DataType::Boolean => SemanticType::Boolean,
        DataType::String => SemanticType::String,
        DataType::Date | DataType::Datetime(..) => SemanticType::Datetime,
        DataType::Categorical(..) | DataType::Enum(..) => SemanticType::Category,
        dt if dt.is_integer() => SemanticType::Integer,
        dt if dt.is_float() => SemanticType::Float,
        _ => SemanticType::Other,
    }
}

/// Dtype declared by a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredDtype {
    Integer,
    Float,
    /// Accepts both integer and float columns.
    Number,
    String,
    Boolean,
    Datetime,
    Category,
}

impl DeclaredDtype {
    /// Parse a declaration case-insensitively; `None` for unsupported names.
    pub fn parse(declared: &str) -> Option<Self> {
        match declared.trim().to_lowercase().as_str() {
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "datetime" => Some(Self::Datetime),
            "category" => Some(Self::Category),
            _ => None,
        }
    }

    /// Whether a column of the observed semantic type satisfies this declaration.
    pub fn accepts(self, observed: SemanticType) -> bool {
        match self {
            Self::Integer => observed == SemanticType::Integer,
            Self::Float => observed == SemanticType::Float,
            Self::Number => observed.is_numeric(),
            Self::String => observed == SemanticType::String,
            Self::Boolean => observed == SemanticType::Boolean,
            Self::Datetime => observed == SemanticType::Datetime,
            Self::Category => observed == SemanticType::Category,
        }
    }
}
