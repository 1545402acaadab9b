//! Writing manifests under an output root.

use super::record::{MANIFEST_PREFIX, ManifestRecord, hash_artefacts};
use super::signer::ManifestSigner;
use crate::error::{Result, ResultExt as _};
use crate::persist::create_once;
use chrono::Utc;
use std::fmt;
use std::path::{Path, PathBuf};

/// Writes one create-once manifest per call, optionally signing it afterwards.
#[derive(Default)]
pub struct ManifestWriter {
    signer: Option<Box<dyn ManifestSigner>>,
}

impl fmt::Debug for ManifestWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestWriter")
            .field("signer", &self.signer.is_some())
            .finish()
    }
}

impl ManifestWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signer(mut self, signer: impl ManifestSigner + 'static) -> Self {
        self.signer = Some(Box::new(signer));
        self
    }

    /// Hash the tracked artefacts of `root` and persist a manifest linked to `prev`.
    ///
    /// Returns the path of the new manifest file. Absent artefacts are
    /// recorded as `null`, and a failing signer is only logged.
    ///
    /// # Errors
    ///
    /// Fails only if an existing artefact can't be read or the manifest file
    /// can't be created.
    pub fn write(&self, root: &Path, prev: Option<&str>) -> Result<PathBuf> {
        let ts = Utc::now();
        let artefacts = hash_artefacts(root)?;
        let record = ManifestRecord::new(ts, artefacts, prev.map(str::to_owned))?;

        let json =
            serde_json::to_string_pretty(&record).context("Failed to serialize manifest")?;
        let path = create_once(root, MANIFEST_PREFIX, ts, "json", json.as_bytes())?;

        let missing = record.missing_artefacts();
        if !missing.is_empty() {
            tracing::warn!("Manifest {} records absent artefacts: {}", path.display(), missing.join(", "));
        }
        tracing::info!("Wrote manifest {} ({})", path.display(), record.manifest_hash);

        if let Some(signer) = &self.signer
            && let Err(e) = signer.sign(&path)
        {
            tracing::warn!("Manifest signing failed for {}: {e}", path.display());
        }

        Ok(path)
    }
}

/// Write a manifest without a signer.
pub fn write_manifest(root: &Path, prev: Option<&str>) -> Result<PathBuf> {
    ManifestWriter::new().write(root, prev)
}
