//! Loading and verifying the manifest chain of an output root.

use super::record::{MANIFEST_PREFIX, ManifestRecord};
use crate::error::Result;
use crate::persist::create_once_sequence;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// What is wrong with a link in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainIssueKind {
    /// Stored hash differs from the recomputed one.
    HashMismatch,
    /// The first manifest points at a predecessor.
    UnexpectedPrevious,
    /// `prev_manifest_hash` differs from the preceding manifest's hash.
    BrokenLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainIssue {
    /// Position of the offending manifest in the chain.
    pub index: usize,
    pub kind: ChainIssueKind,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub length: usize,
    pub issues: Vec<ChainIssue>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Sort key of a manifest file name: `(millis, collision suffix)`.
fn manifest_sequence(path: &Path) -> Option<(i64, u32)> {
    let name = path.file_name()?.to_str()?;
    let (stem, sequence) = create_once_sequence(name, "json")?;
    (stem == MANIFEST_PREFIX).then_some(sequence)
}

fn manifest_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<((i64, u32), PathBuf)> = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if let Some(seq) = manifest_sequence(&path)
            && path.is_file()
        {
            paths.push((seq, path));
        }
    }
    paths.sort();
    Ok(paths.into_iter().map(|(_, path)| path).collect())
}

/// All manifests of `root`, oldest first. Empty if `root` does not exist.
pub fn load_chain(root: &Path) -> Result<Vec<ManifestRecord>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let records = manifest_paths(root)?
        .iter()
        .map(|path| ManifestRecord::load(path))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!("Loaded {} manifests from {}", records.len(), root.display());
    Ok(records)
}

/// Check every record's hash and every link of an ordered chain.
pub fn verify_chain(records: &[ManifestRecord]) -> Result<ChainReport> {
    let mut issues = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let recomputed = record.compute_hash()?;
        if recomputed != record.manifest_hash {
            issues.push(ChainIssue {
                index,
                kind: ChainIssueKind::HashMismatch,
                message: "Stored manifest hash does not match its content".to_owned(),
                expected: Some(recomputed),
                actual: Some(record.manifest_hash.clone()),
            });
        }

        match index.checked_sub(1).and_then(|i| records.get(i)) {
            None if record.prev_manifest_hash.is_some() => issues.push(ChainIssue {
                index,
                kind: ChainIssueKind::UnexpectedPrevious,
                message: "First manifest links to a previous manifest".to_owned(),
                expected: None,
                actual: record.prev_manifest_hash.clone(),
            }),
            Some(previous)
                if record.prev_manifest_hash.as_deref() != Some(previous.manifest_hash.as_str()) =>
            {
                issues.push(ChainIssue {
                    index,
                    kind: ChainIssueKind::BrokenLink,
                    message: "Manifest does not link to its predecessor".to_owned(),
                    expected: Some(previous.manifest_hash.clone()),
                    actual: record.prev_manifest_hash.clone(),
                });
            }
            _ => {}
        }
    }

    if issues.is_empty() {
        tracing::info!("Manifest chain of {} records is intact", records.len());
    } else {
        tracing::warn!("Manifest chain has {} issue(s)", issues.len());
    }

    Ok(ChainReport {
        length: records.len(),
        issues,
    })
}

/// Hash a new run should link to, `None` for a fresh root.
pub fn latest_manifest_hash(root: &Path) -> Result<Option<String>> {
    Ok(load_chain(root)?.pop().map(|record| record.manifest_hash))
}
