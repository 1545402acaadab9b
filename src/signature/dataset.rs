//! Dataset signatures.
//!
//! The dataset is rendered to CSV (header row in column order, then every row
//! in order) and that rendering is streamed straight into the hasher, so the
//! digest depends only on values, column order and row order.

use crate::error::{Result, ResultExt as _};
use polars::prelude::*;
use sha2::{Digest as _, Sha256};

/// Compute the Data Signature of a dataset.
///
/// # Errors
///
/// Returns error if polars cannot render one of the columns.
pub fn dataset_signature(df: &DataFrame) -> Result<String> {
    let mut hasher = Sha256::new();
    // CsvWriter needs a mutable frame; cloning only bumps column refcounts.
    let mut frame = df.clone();

    CsvWriter::new(&mut hasher)
        .include_header(true)
        .finish(&mut frame)
        .context("Failed to render dataset for signature")?;

    Ok(format!("{:x}", hasher.finalize()))
}
