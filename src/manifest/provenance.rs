//! Run provenance and lineage documents.
//!
//! Both are rewritten by every run and then sealed by that run's manifest, so
//! an earlier version survives only as the hash an earlier manifest recorded.

use super::record::{LINEAGE_PATH, PROVENANCE_PATH};
use crate::error::{Result, ResultExt as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a run's data came from and what it was checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub created: DateTime<Utc>,
    pub tool: String,
    pub inputs: ProvenanceInputs,
    pub data_signature: String,
    pub schema_version: Option<String>,
    /// Identifiers of the charts checked in this run
    pub charts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceInputs {
    pub data_csv: PathBuf,
    pub schema: PathBuf,
}

impl Provenance {
    pub fn new(inputs: ProvenanceInputs, data_signature: impl Into<String>) -> Self {
        Self {
            created: Utc::now(),
            tool: concat!("datacert ", env!("CARGO_PKG_VERSION")).to_owned(),
            inputs,
            data_signature: data_signature.into(),
            schema_version: None,
            charts: Vec::new(),
        }
    }

    pub fn with_schema_version(mut self, version: Option<String>) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_charts(mut self, charts: Vec<String>) -> Self {
        self.charts = charts;
        self
    }

    /// Write `provenance.manifest.json` under `root`.
    pub fn save(&self, root: &Path) -> Result<PathBuf> {
        let path = root.join(PROVENANCE_PATH);
        write_json(&path, self)?;
        tracing::debug!("Wrote provenance to {}", path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read provenance: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse provenance: {}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Dataset,
    Check,
    Artefact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub from: String,
    pub to: String,
}

/// Directed graph from the dataset through each check to its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
    pub schema_version: Option<String>,
}

impl Lineage {
    /// Lineage of a run that validated the dataset and checked `charts`.
    ///
    /// The chart branch is left out when no charts were checked.
    pub fn for_run(schema_version: Option<&str>, charts: &[String]) -> Self {
        let mut lineage = Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            schema_version: schema_version.map(str::to_owned),
        };

        lineage.node("dataset", NodeKind::Dataset);
        lineage.node("schema_validation", NodeKind::Check);
        lineage.node("validation_summary", NodeKind::Artefact);
        lineage.edge("dataset", "schema_validation");
        lineage.edge("schema_validation", "validation_summary");

        if !charts.is_empty() {
            lineage.node("chart_validation", NodeKind::Check);
            lineage.node("chart_report", NodeKind::Artefact);
            lineage.edge("dataset", "chart_validation");
            for identifier in charts {
                let id = format!("chart:{identifier}");
                lineage.node(&id, NodeKind::Artefact);
                lineage.edge(&id, "chart_validation");
            }
            lineage.edge("chart_validation", "chart_report");
        }

        lineage
    }

    fn node(&mut self, id: &str, kind: NodeKind) {
        self.nodes.push(LineageNode {
            id: id.to_owned(),
            kind,
        });
    }

    fn edge(&mut self, from: &str, to: &str) {
        self.edges.push(LineageEdge {
            from: from.to_owned(),
            to: to.to_owned(),
        });
    }

    /// Write `lineage/lineage.json` under `root`.
    pub fn save(&self, root: &Path) -> Result<PathBuf> {
        let path = root.join(LINEAGE_PATH);
        write_json(&path, self)?;
        tracing::debug!("Wrote lineage to {}", path.display());
        Ok(path)
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize document")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
