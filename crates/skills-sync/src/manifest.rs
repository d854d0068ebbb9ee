//! Per-client sync manifest (§3, §4.10 step 6): the record of what was
//! exported and at what hashes, used by the diff/pull stages to detect
//! drift. Rewritten wholesale on every successful non-dry-run export.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use resource_core::{ResourceError, ResourceResult, ResourceType};
use resource_io::safe_write;
use serde::{Deserialize, Serialize};

/// One exported resource's recorded state, keyed by qualified key in the
/// owning [`Manifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub source_hash: String,
    pub output_hash: String,
    /// Output file paths relative to the client's output root, in write
    /// order.
    pub output_paths: Vec<String>,
    /// RFC 3339 timestamp of the export that produced this entry.
    pub exported_at: String,
}

/// A client's full export state: `{qualified_key: ManifestEntry}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(flatten)]
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load the manifest at `path`. A missing or unparseable file is
    /// treated as an empty manifest — §7's `ManifestCorruption` policy:
    /// "no export is refused".
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "manifest corrupted; treating as empty");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist this manifest wholesale, through the safe writer.
    pub fn save(&self, path: &Path) -> ResourceResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|err| ResourceError::ManifestCorruption(err.to_string()))?;
        safe_write(path, &json)
    }

    /// Entry for `qualified_key`, if this client has exported it before.
    pub fn get(&self, qualified_key: &str) -> Option<&ManifestEntry> {
        self.entries.get(qualified_key)
    }

    /// Every recorded qualified key, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Record or overwrite one entry.
    pub fn insert(&mut self, qualified_key: String, entry: ManifestEntry) {
        self.entries.insert(qualified_key, entry);
    }

    /// Replace the manifest's full contents.
    pub fn replace_all(&mut self, entries: BTreeMap<String, ManifestEntry>) {
        self.entries = entries;
    }
}

/// Path to the manifest file for `client_id`, under `cache_dir`.
pub fn manifest_path(cache_dir: &Path, client_id: &str) -> PathBuf {
    cache_dir.join(format!("skills-sync.{client_id}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry() -> ManifestEntry {
        ManifestEntry {
            resource_id: "review".to_string(),
            resource_type: ResourceType::Prompt,
            source_hash: "src-hash".to_string(),
            output_hash: "out-hash".to_string(),
            output_paths: vec!["review/SKILL.md".to_string()],
            exported_at: "2026-07-28T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn missing_manifest_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load(&manifest_path(dir.path(), "claude-code"));
        assert!(manifest.keys().next().is_none());
    }

    #[test]
    fn corrupt_manifest_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = manifest_path(dir.path(), "claude-code");
        std::fs::write(&path, "not json").unwrap();
        let manifest = Manifest::load(&path);
        assert!(manifest.keys().next().is_none());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = manifest_path(dir.path(), "claude-code");

        let mut manifest = Manifest::default();
        manifest.insert("prompt:development/review".to_string(), entry());
        manifest.save(&path).unwrap();

        let reloaded = Manifest::load(&path);
        assert_eq!(
            reloaded.get("prompt:development/review").unwrap().output_hash,
            "out-hash"
        );
    }
}
