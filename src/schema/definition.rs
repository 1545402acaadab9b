//! Schema documents.
//!
//! ```yaml
//! version: "2024.1"
//! description: Quarterly satisfaction survey
//! columns:
//!   - name: respondent_id
//!     dtype: integer
//!     nullable: false
//!   - name: segment
//!     dtype: string
//!     allowed_values: [A, B, C]
//!   - name: age
//!     dtype: number
//!     minimum: 18
//!     maximum: 99
//! ```

use crate::error::{CertError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Definition of an expected column in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,

    /// Declared semantic dtype, kept verbatim so a bad declaration can be
    /// reported against its column instead of failing the whole load.
    pub dtype: String,

    #[serde(default = "default_true")]
    pub required: bool,

    #[serde(default = "default_true")]
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ColumnSchema {
    /// A required, nullable column with no further constraints.
    pub fn new(name: impl Into<String>, dtype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            required: true,
            nullable: true,
            allowed_values: None,
            minimum: None,
            maximum: None,
            notes: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn non_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }
}

/// Ordered collection of column definitions with optional metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaDefinition {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self {
            columns,
            version: None,
            description: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Load a schema from YAML (`.yaml`/`.yml`) or JSON (anything else).
    ///
    /// # Errors
    ///
    /// Returns [`CertError::InvalidPath`] if the file is missing and
    /// [`CertError::Schema`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CertError::InvalidPath(format!(
                "Schema file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;

        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        let schema = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml(&content)?,
            _ => Self::from_json(&content)?,
        };

        tracing::debug!(
            "Loaded schema {} ({} columns, version {:?})",
            path.display(),
            schema.columns.len(),
            schema.version
        );

        Ok(schema)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| CertError::Schema(format!("Failed to parse YAML schema: {e}")))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| CertError::Schema(format!("Failed to parse JSON schema: {e}")))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn default_true() -> bool {
    true
}
