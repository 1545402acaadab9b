//! Streaming file and directory hashing.

use crate::error::{Result, ResultExt as _};
use sha2::{Digest as _, Sha256};
use std::fs::File;
use std::io::{BufReader, Read as _};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Buffer size for streaming file reads (8 KB).
///
/// Memory stays constant regardless of file size.
const BUFFER_SIZE: usize = 8192;

/// SHA-256 of an in-memory byte slice, as lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn stream_into(hasher: &mut Sha256, path: &Path) -> Result<()> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        if bytes_read == 0 {
            break;
        }

        if let Some(chunk) = buffer.get(..bytes_read) {
            hasher.update(chunk);
        }
    }

    Ok(())
}

/// Compute SHA-256 of a file using streaming I/O.
///
/// # Errors
///
/// Returns error if the file doesn't exist, can't be opened or can't be read.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    stream_into(&mut hasher, path)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash a file if it exists and is a regular file; `None` otherwise.
///
/// Absence is evidence, not a failure. I/O errors on a file that does exist
/// are still reported.
pub fn hash_file_if_present(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    hash_file(path).map(Some)
}

/// Stable hash of every regular file under `dir`.
///
/// Entries are sorted by their `/`-separated path relative to `dir`, so the
/// result does not depend on filesystem enumeration order. For each entry the
/// relative path, a NUL byte, the entry's own digest and a newline are folded
/// into the outer digest. Symlinks are not followed and, like empty
/// directories, contribute nothing.
///
/// # Errors
///
/// Returns error if the directory can't be walked or a file can't be read.
pub fn hash_directory(dir: &Path) -> Result<String> {
    let mut entries: Vec<(String, PathBuf)> = Vec::new();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or_else(|_| entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        entries.push((relative, entry.into_path()));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (relative, path) in &entries {
        let digest = hash_file(path)?;
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }

    tracing::debug!("Hashed {} files under {}", entries.len(), dir.display());

    Ok(format!("{:x}", hasher.finalize()))
}
