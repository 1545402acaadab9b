//! The two filesystem disciplines every writer in the crate goes through.
//!
//! - **Append-only**: audit logs get exactly one complete line per call. The
//!   handle is scoped to the call and synced before it is dropped, so every
//!   exit path (including errors) releases it.
//! - **Create-once**: manifests and chart metadata always land in a new file
//!   whose name embeds the creation time. Same-instant collisions are resolved
//!   with a monotonic `-N` suffix; an existing file is never opened for writing.

use crate::error::{Result, ResultExt as _};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

/// Append one line to `path`, creating the file and its parent directory if needed.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log for append: {}", path.display()))?;

    // Single write so a line is never split across calls.
    file.write_all(buf.as_bytes())
        .with_context(|| format!("Failed to append to log: {}", path.display()))?;
    file.flush()?;
    file.sync_data()
        .with_context(|| format!("Failed to sync log: {}", path.display()))?;

    Ok(())
}

/// File name for the `n`th candidate of a create-once write.
fn candidate_name(stem: &str, millis: i64, n: u32, ext: &str) -> String {
    if n == 0 {
        format!("{stem}.{millis}.{ext}")
    } else {
        format!("{stem}.{millis}-{n}.{ext}")
    }
}

/// Split a create-once file name into its stem and `(millis, suffix)` sequence.
///
/// The sequence orders files in creation order; lexical order of the names
/// does not (`-10` sorts before `-2`).
pub fn create_once_sequence<'a>(file_name: &'a str, ext: &str) -> Option<(&'a str, (i64, u32))> {
    let rest = file_name.strip_suffix(ext)?.strip_suffix('.')?;
    let (stem, stamp) = rest.rsplit_once('.')?;
    let sequence = match stamp.split_once('-') {
        Some((millis, n)) => (millis.parse().ok()?, n.parse().ok()?),
        None => (stamp.parse().ok()?, 0),
    };
    Some((stem, sequence))
}

/// Write `contents` to a brand-new file in `dir` named `<stem>.<unix-millis>[-N].<ext>`.
///
/// Returns the path that was created.
pub fn create_once(
    dir: &Path,
    stem: &str,
    ts: DateTime<Utc>,
    ext: &str,
    contents: &[u8],
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let millis = ts.timestamp_millis();
    let mut n = 0u32;
    loop {
        let path = dir.join(candidate_name(stem, millis, n, ext));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(contents)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                file.sync_all()
                    .with_context(|| format!("Failed to sync {}", path.display()))?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("{} already exists, trying next suffix", path.display());
                n += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()));
            }
        }
    }
}
