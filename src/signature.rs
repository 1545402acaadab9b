//! Data Signatures: deterministic content fingerprints.
//!
//! A signature is a lowercase hex SHA-256 digest. It serves two purposes:
//!
//! - **Freshness token**: a validation report embeds the dataset's signature,
//!   chart specs capture it when they are authored, and the chart checker
//!   flags any chart whose captured signature differs from the current one.
//! - **Tamper detection**: the integrity manifest records the signature of
//!   every tracked artefact and chains manifests together by their own hash.
//!
//! All functions here are pure given their inputs; large files are streamed
//! through a fixed-size buffer.

pub mod dataset;
pub mod files;

pub use dataset::dataset_signature;
pub use files::{hash_bytes, hash_directory, hash_file, hash_file_if_present};

/// Hash algorithm identifier recorded alongside signatures.
pub const HASH_ALGORITHM: &str = "SHA-256";
