use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use resource_core::ResourceResult;
use serde::{Deserialize, Serialize};

use crate::safe_write::safe_write;

/// `{qualified_key: source_hash}` snapshot persisted under the cache
/// directory so the next startup can detect out-of-session changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Baseline {
    #[serde(flatten)]
    hashes: BTreeMap<String, String>,
}

/// Counts of resources added, modified, or removed since the last
/// persisted baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    /// Qualified keys present now but absent from the baseline.
    pub added: Vec<String>,
    /// Qualified keys present in both, with a different `source_hash`.
    pub modified: Vec<String>,
    /// Qualified keys present in the baseline but absent now.
    pub removed: Vec<String>,
}

impl ChangeReport {
    /// Whether the current state matches the baseline exactly.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Computes and persists the startup change report described in §4.9:
/// compares the current `source_hash` of every registry entry against a
/// prior baseline file, and rewrites that baseline on request.
pub struct ChangeTracker {
    baseline_path: PathBuf,
}

impl ChangeTracker {
    /// Build a tracker backed by `baseline_path` (typically
    /// `cache/resource-baseline.json`).
    pub fn new(baseline_path: impl Into<PathBuf>) -> Self {
        Self {
            baseline_path: baseline_path.into(),
        }
    }

    /// Read the persisted baseline. A missing or unparseable file is
    /// non-fatal: it is treated as an empty baseline (everything currently
    /// present reads as "added").
    fn load(&self) -> BTreeMap<String, String> {
        match std::fs::read_to_string(&self.baseline_path) {
            Ok(content) => match serde_json::from_str::<Baseline>(&content) {
                Ok(baseline) => baseline.hashes,
                Err(err) => {
                    tracing::warn!(
                        path = %self.baseline_path.display(),
                        error = %err,
                        "failed to parse resource baseline; treating as empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                tracing::warn!(
                    path = %self.baseline_path.display(),
                    error = %err,
                    "failed to read resource baseline; treating as empty"
                );
                BTreeMap::new()
            }
        }
    }

    /// Compare `current` (every loaded resource's qualified key ->
    /// `source_hash`) against the persisted baseline and report the delta.
    /// Does not mutate the persisted baseline; call [`Self::persist`]
    /// separately once the comparison has been logged/consumed.
    pub fn compare(&self, current: &BTreeMap<String, String>) -> ChangeReport {
        let previous = self.load();
        let mut report = ChangeReport::default();

        for (key, hash) in current {
            match previous.get(key) {
                None => report.added.push(key.clone()),
                Some(previous_hash) if previous_hash != hash => report.modified.push(key.clone()),
                Some(_) => {}
            }
        }
        for key in previous.keys() {
            if !current.contains_key(key) {
                report.removed.push(key.clone());
            }
        }

        report.added.sort();
        report.modified.sort();
        report.removed.sort();
        report
    }

    /// Rewrite the baseline file wholesale from `current`, through the
    /// safe writer so a crash mid-rewrite never corrupts the previous
    /// baseline. Called at graceful shutdown or on explicit request.
    pub fn persist(&self, current: &BTreeMap<String, String>) -> ResourceResult<()> {
        let baseline = Baseline {
            hashes: current.clone(),
        };
        let json = serde_json::to_vec_pretty(&baseline)
            .map_err(|err| resource_core::ResourceError::ManifestCorruption(err.to_string()))?;
        safe_write(&self.baseline_path, &json)
    }

    /// The path this tracker reads/writes.
    pub fn path(&self) -> &Path {
        &self.baseline_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keys(report: &[String]) -> Vec<&str> {
        report.iter().map(String::as_str).collect()
    }

    #[test]
    fn missing_baseline_reports_everything_as_added() {
        let dir = TempDir::new().unwrap();
        let tracker = ChangeTracker::new(dir.path().join("baseline.json"));

        let mut current = BTreeMap::new();
        current.insert("gate:code-quality".to_string(), "hash-a".to_string());

        let report = tracker.compare(&current);
        assert_eq!(keys(&report.added), vec!["gate:code-quality"]);
        assert!(report.modified.is_empty());
        assert!(report.removed.is_empty());
    }

    #[test]
    fn unreadable_baseline_is_non_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "not json at all {{{").unwrap();
        let tracker = ChangeTracker::new(path);

        let report = tracker.compare(&BTreeMap::new());
        assert!(report.is_empty());
    }

    #[test]
    fn roundtrip_detects_added_modified_and_removed() {
        let dir = TempDir::new().unwrap();
        let tracker = ChangeTracker::new(dir.path().join("baseline.json"));

        let mut first = BTreeMap::new();
        first.insert("gate:code-quality".to_string(), "hash-a".to_string());
        first.insert("gate:test-coverage".to_string(), "hash-b".to_string());
        tracker.persist(&first).unwrap();

        let mut second = BTreeMap::new();
        second.insert("gate:code-quality".to_string(), "hash-a-changed".to_string());
        second.insert("gate:new-gate".to_string(), "hash-c".to_string());

        let report = tracker.compare(&second);
        assert_eq!(keys(&report.added), vec!["gate:new-gate"]);
        assert_eq!(keys(&report.modified), vec!["gate:code-quality"]);
        assert_eq!(keys(&report.removed), vec!["gate:test-coverage"]);
    }

    #[test]
    fn persist_then_compare_against_self_is_empty() {
        let dir = TempDir::new().unwrap();
        let tracker = ChangeTracker::new(dir.path().join("baseline.json"));

        let mut current = BTreeMap::new();
        current.insert("gate:code-quality".to_string(), "hash-a".to_string());
        tracker.persist(&current).unwrap();

        assert!(tracker.compare(&current).is_empty());
    }
}
