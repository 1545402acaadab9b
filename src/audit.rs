//! Pipeline audit log.
//!
//! Every step of a certification run appends one JSON object to
//! `audit.jsonl` under the output root: `{ts, level, event, ...fields}` with
//! keys in sorted order. The file is itself a tracked manifest artefact, so
//! the run's own trail is sealed by its manifest.

use crate::error::{Result, ResultExt as _};
use crate::issues::Context;
use crate::persist::append_line;
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const AUDIT_LOG_FILE: &str = "audit.jsonl";

#[derive(Debug, Clone)]
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Logger writing to `audit.jsonl` under `output_dir`.
    pub fn for_root(output_dir: &Path) -> Self {
        Self::new(output_dir.join(AUDIT_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event. `ts`, `level` and `event` override same-named fields.
    pub fn log(&self, level: &str, event: &str, fields: Context) -> Result<()> {
        let mut entry = fields;
        entry.insert("ts".to_owned(), Value::String(Utc::now().to_rfc3339()));
        entry.insert("level".to_owned(), Value::String(level.to_owned()));
        entry.insert("event".to_owned(), Value::String(event.to_owned()));

        let line = serde_json::to_string(&entry).context("Failed to serialize audit event")?;
        append_line(&self.path, &line)
    }

    pub fn info(&self, event: &str, fields: Context) -> Result<()> {
        self.log("INFO", event, fields)
    }

    pub fn warn(&self, event: &str, fields: Context) -> Result<()> {
        self.log("WARN", event, fields)
    }

    pub fn error(&self, event: &str, fields: Context) -> Result<()> {
        self.log("ERROR", event, fields)
    }
}
