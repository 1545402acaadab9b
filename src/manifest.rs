//! Integrity manifest chain.
//!
//! At the end of every pipeline run a manifest records the hash of each
//! tracked artefact under the output root, links to the previous run's
//! manifest hash, and is hashed itself over a canonical serialization. The
//! manifests of one root therefore form an append-only, singly linked chain
//! in which reordering, deletion or substitution of an earlier run is
//! detectable by recomputation alone.
//!
//! ## Manifest Format
//!
//! ```json
//! {
//!   "ts": "2026-01-24T12:34:56.789Z",
//!   "artefacts": {
//!     "audit_jsonl": "9f86d081...",
//!     "charts_dir_hash": "e3b0c442...",
//!     "lineage_json": null,
//!     "provenance_manifest": null,
//!     "report_md": "a3b2c1d4..."
//!   },
//!   "prev_manifest_hash": "5e884898...",
//!   "manifest_hash": "2c26b46b..."
//! }
//! ```
//!
//! A missing artefact is recorded as `null`; writing a manifest never fails
//! because an artefact is absent. A certification run writes its own
//! [`Provenance`] and [`Lineage`] documents just before sealing, so those two
//! are always present in a run's manifest.
//!
//! ## Usage
//!
//! ```no_run
//! use datacert::manifest::{ManifestWriter, latest_manifest_hash};
//! use std::path::Path;
//!
//! # fn example() -> datacert::error::Result<()> {
//! let root = Path::new("outputs");
//! let prev = latest_manifest_hash(root)?;
//! let path = ManifestWriter::new().write(root, prev.as_deref())?;
//! println!("wrote {}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod provenance;
pub mod record;
pub mod signer;
pub mod writer;

pub use chain::{
    ChainIssue, ChainIssueKind, ChainReport, latest_manifest_hash, load_chain, verify_chain,
};
pub use provenance::{Lineage, LineageEdge, LineageNode, NodeKind, Provenance, ProvenanceInputs};
pub use record::{
    ArtefactKind, Artefacts, LINEAGE_PATH, MANIFEST_PREFIX, ManifestRecord, PROVENANCE_PATH,
    TRACKED_ARTEFACTS, TrackedArtefact, hash_artefacts,
};
pub use signer::{CommandSigner, ManifestSigner};
pub use writer::{ManifestWriter, write_manifest};
