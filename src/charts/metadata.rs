//! Chart metadata files and materialized chart outputs on disk.
//!
//! Metadata is written create-once as `<identifier>.<unix-millis>[-N].meta.json`,
//! so re-rendering a chart adds a new file rather than rewriting history. The
//! newest file per identifier is the one that counts. Materialized outputs
//! live next to the metadata as `<identifier>.csv`.

use super::spec::ChartSpec;
use crate::error::{CertError, Result, ResultExt as _};
use crate::frame::load_csv;
use crate::persist::{create_once, create_once_sequence};
use chrono::Utc;
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

const METADATA_EXT: &str = "meta.json";

/// Persist `spec` as a new metadata file in `dir` and return its path.
///
/// `created_at` is stamped with the current time when the spec has none.
pub fn save_chart_metadata(spec: &ChartSpec, dir: &Path) -> Result<PathBuf> {
    if spec.identifier.is_empty()
        || spec.identifier.contains(['/', '\\'])
        || spec.identifier.starts_with('.')
    {
        return Err(CertError::InvalidPath(format!(
            "Chart identifier cannot be used as a file name: {:?}",
            spec.identifier
        )));
    }

    let created_at = spec.created_at.unwrap_or_else(Utc::now);
    let mut stamped = spec.clone();
    stamped.created_at = Some(created_at);

    let json = serde_json::to_string_pretty(&stamped)
        .context("Failed to serialize chart metadata")?;
    let path = create_once(dir, &spec.identifier, created_at, METADATA_EXT, json.as_bytes())?;

    tracing::info!("Saved chart metadata for '{}' to {}", spec.identifier, path.display());
    Ok(path)
}

pub fn load_chart_metadata(path: &Path) -> Result<ChartSpec> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read chart metadata: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chart metadata: {}", path.display()))
}

/// Load the newest spec per identifier from `dir`, ordered by identifier.
pub fn load_chart_specs(dir: &Path) -> Result<Vec<ChartSpec>> {
    if !dir.is_dir() {
        return Err(CertError::InvalidPath(format!(
            "Chart metadata directory not found: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<((i64, u32), PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let sequence = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| create_once_sequence(n, METADATA_EXT));
        if let Some((_, sequence)) = sequence
            && path.is_file()
        {
            paths.push((sequence, path));
        }
    }
    // Creation order, so a later save wins a `created_at` tie.
    paths.sort();

    let mut latest: BTreeMap<String, ChartSpec> = BTreeMap::new();
    for (_, path) in paths {
        let spec = load_chart_metadata(&path)?;
        let newer = latest
            .get(&spec.identifier)
            .is_none_or(|current| spec.created_at >= current.created_at);
        if newer {
            latest.insert(spec.identifier.clone(), spec);
        }
    }

    tracing::debug!("Loaded {} chart specs from {}", latest.len(), dir.display());
    Ok(latest.into_values().collect())
}

/// Load `<identifier>.csv` from `dir` for every spec that has one.
///
/// Charts without an output file are left out; the checker reports them.
pub fn load_materialized_charts(
    dir: &Path,
    specs: &[ChartSpec],
) -> Result<HashMap<String, DataFrame>> {
    let mut charts = HashMap::new();
    for spec in specs {
        let path = dir.join(format!("{}.csv", spec.identifier));
        if path.is_file() {
            charts.insert(spec.identifier.clone(), load_csv(&path)?);
        }
    }
    Ok(charts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::spec::{Aggregation, ChartKind};
    use chrono::{Duration, TimeZone as _};
    use tempfile::TempDir;

    fn spec(id: &str) -> ChartSpec {
        ChartSpec::new(id, ChartKind::Bar, "segment")
            .with_y("score")
            .with_aggregation(Aggregation::Mean)
            .with_signature("abc")
    }

    #[test]
    fn test_save_and_load_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let path = save_chart_metadata(&spec("by_segment"), temp_dir.path()).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("by_segment."));
        assert!(name.ends_with(".meta.json"));

        let loaded = load_chart_metadata(&path).unwrap();
        assert_eq!(loaded.identifier, "by_segment");
        assert_eq!(loaded.data_signature.as_deref(), Some("abc"));
        assert!(loaded.created_at.is_some());
    }

    #[test]
    fn test_resave_creates_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut s = spec("by_segment");
        s.created_at = Some(ts);

        let first = save_chart_metadata(&s, temp_dir.path()).unwrap();
        let second = save_chart_metadata(&s, temp_dir.path()).unwrap();
        assert_ne!(first, second);
        assert!(first.exists());
    }

    #[test]
    fn test_load_specs_keeps_newest_per_identifier() {
        let temp_dir = TempDir::new().unwrap();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let mut old = spec("trend").with_signature("old");
        old.created_at = Some(base);
        let mut new = spec("trend").with_signature("new");
        new.created_at = Some(base + Duration::hours(1));
        let mut other = spec("by_segment");
        other.created_at = Some(base);

        save_chart_metadata(&new, temp_dir.path()).unwrap();
        save_chart_metadata(&old, temp_dir.path()).unwrap();
        save_chart_metadata(&other, temp_dir.path()).unwrap();

        let specs = load_chart_specs(temp_dir.path()).unwrap();
        let ids: Vec<_> = specs.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["by_segment", "trend"]);
        assert_eq!(specs[1].data_signature.as_deref(), Some("new"));
    }

    #[test]
    fn test_later_save_wins_timestamp_tie() {
        let temp_dir = TempDir::new().unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        // Eleven saves push the suffix past `-9`, where name order and
        // creation order part ways.
        for n in 0..10 {
            let mut s = spec("trend").with_signature(format!("draft-{n}"));
            s.created_at = Some(ts);
            save_chart_metadata(&s, temp_dir.path()).unwrap();
        }
        let mut last = spec("trend").with_signature("final");
        last.created_at = Some(ts);
        let path = save_chart_metadata(&last, temp_dir.path()).unwrap();
        assert!(path.to_string_lossy().ends_with("-10.meta.json"));

        let specs = load_chart_specs(temp_dir.path()).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].data_signature.as_deref(), Some("final"));
    }

    #[test]
    fn test_rejects_path_like_identifier() {
        let temp_dir = TempDir::new().unwrap();
        let result = save_chart_metadata(&spec("../escape"), temp_dir.path());
        assert!(matches!(result, Err(CertError::InvalidPath(_))));
    }

    #[test]
    fn test_load_materialized_charts() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("by_segment.csv"),
            "segment,score\nA,4.5\nB,3.0\n",
        )
        .unwrap();

        let specs = vec![spec("by_segment"), spec("absent")];
        let charts = load_materialized_charts(temp_dir.path(), &specs).unwrap();

        assert_eq!(charts.len(), 1);
        assert_eq!(charts["by_segment"].height(), 2);
        assert!(!charts.contains_key("absent"));
    }
}
