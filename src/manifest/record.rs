//! Manifest records and their canonical hash.

use crate::error::{Result, ResultExt as _};
use crate::signature::{hash_bytes, hash_directory, hash_file_if_present};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// File name prefix of every manifest: `integrity.manifest.<unix-millis>.json`.
pub const MANIFEST_PREFIX: &str = "integrity.manifest";

/// Run provenance document, relative to the output root.
pub const PROVENANCE_PATH: &str = "provenance.manifest.json";

/// Lineage graph, relative to the output root.
pub const LINEAGE_PATH: &str = "lineage/lineage.json";

/// How an artefact is hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtefactKind {
    File,
    /// Hashed as a subtree, independent of enumeration order.
    Directory,
}

/// An artefact a manifest always accounts for.
#[derive(Debug, Clone, Copy)]
pub struct TrackedArtefact {
    pub name: &'static str,
    /// Path relative to the output root.
    pub path: &'static str,
    pub kind: ArtefactKind,
}

pub const TRACKED_ARTEFACTS: [TrackedArtefact; 5] = [
    TrackedArtefact {
        name: "report_md",
        path: "report.md",
        kind: ArtefactKind::File,
    },
    TrackedArtefact {
        name: "audit_jsonl",
        path: "audit.jsonl",
        kind: ArtefactKind::File,
    },
    TrackedArtefact {
        name: "provenance_manifest",
        path: PROVENANCE_PATH,
        kind: ArtefactKind::File,
    },
    TrackedArtefact {
        name: "charts_dir_hash",
        path: "charts",
        kind: ArtefactKind::Directory,
    },
    TrackedArtefact {
        name: "lineage_json",
        path: LINEAGE_PATH,
        kind: ArtefactKind::File,
    },
];

/// Artefact name to hash, `None` when the artefact was absent.
pub type Artefacts = BTreeMap<String, Option<String>>;

/// Hash every tracked artefact under `root`.
///
/// Absent artefacts map to `None`. Only I/O failures on artefacts that do
/// exist are errors.
pub fn hash_artefacts(root: &Path) -> Result<Artefacts> {
    let mut artefacts = Artefacts::new();
    for tracked in &TRACKED_ARTEFACTS {
        let path = root.join(tracked.path);
        let hash = match tracked.kind {
            ArtefactKind::File => hash_file_if_present(&path)?,
            ArtefactKind::Directory if path.is_dir() => Some(hash_directory(&path)?),
            ArtefactKind::Directory => None,
        };
        if hash.is_none() {
            tracing::debug!("Artefact '{}' absent at {}", tracked.name, path.display());
        }
        artefacts.insert(tracked.name.to_owned(), hash);
    }
    Ok(artefacts)
}

/// One run's integrity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub ts: DateTime<Utc>,
    pub artefacts: Artefacts,
    pub prev_manifest_hash: Option<String>,
    /// SHA-256 of the canonical serialization of the three fields above.
    pub manifest_hash: String,
}

impl ManifestRecord {
    /// Build a record and compute its hash.
    pub fn new(
        ts: DateTime<Utc>,
        artefacts: Artefacts,
        prev_manifest_hash: Option<String>,
    ) -> Result<Self> {
        let manifest_hash = canonical_hash(&ts, &artefacts, prev_manifest_hash.as_deref())?;
        Ok(Self {
            ts,
            artefacts,
            prev_manifest_hash,
            manifest_hash,
        })
    }

    /// Recompute the hash from the record's content, ignoring the stored one.
    pub fn compute_hash(&self) -> Result<String> {
        canonical_hash(&self.ts, &self.artefacts, self.prev_manifest_hash.as_deref())
    }

    pub fn is_hash_valid(&self) -> Result<bool> {
        Ok(self.compute_hash()? == self.manifest_hash)
    }

    /// Names of artefacts recorded as absent.
    pub fn missing_artefacts(&self) -> Vec<&str> {
        self.artefacts
            .iter()
            .filter(|(_, hash)| hash.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))
    }
}

/// Compact JSON with sorted keys over `{artefacts, prev_manifest_hash, ts}`.
fn canonical_hash(
    ts: &DateTime<Utc>,
    artefacts: &Artefacts,
    prev_manifest_hash: Option<&str>,
) -> Result<String> {
    // serde_json's map is ordered, so keys serialize sorted.
    let body = json!({
        "artefacts": artefacts,
        "prev_manifest_hash": prev_manifest_hash,
        "ts": ts,
    });
    let bytes = serde_json::to_vec(&body).context("Failed to serialize manifest body")?;
    Ok(hash_bytes(&bytes))
}
