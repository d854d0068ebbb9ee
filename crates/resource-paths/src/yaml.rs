use std::path::Path;

use resource_core::{ResourceError, ResourceResult};
use serde::de::DeserializeOwned;

/// Parse a single YAML file into `T`.
///
/// A missing file is not an error when `required` is `false` — `Ok(None)`
/// is returned instead. A missing *required* file, or a file that exists
/// but fails to parse, always surfaces as [`ResourceError::ParseError`].
pub fn load_yaml_file<T: DeserializeOwned>(path: &Path, required: bool) -> ResourceResult<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => return Ok(None),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ResourceError::parse(path, "required file is missing"))
        }
        Err(err) => return Err(ResourceError::io(path, err)),
    };

    serde_yml::from_str(&content)
        .map(Some)
        .map_err(|err| ResourceError::parse(path, err.to_string()))
}

/// Parse a single JSON file into `T`, with the same required/missing
/// semantics as [`load_yaml_file`].
pub fn load_json_file<T: DeserializeOwned>(path: &Path, required: bool) -> ResourceResult<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => return Ok(None),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ResourceError::parse(path, "required file is missing"))
        }
        Err(err) => return Err(ResourceError::io(path, err)),
    };

    serde_json::from_str(&content).map(Some).map_err(|err| ResourceError::parse(path, err.to_string()))
}

/// Read a plain text file (e.g. `system-message.md`, `guidance.md`).
/// Returns `Ok(None)` for a missing optional file.
pub fn load_text_file(path: &Path, required: bool) -> ResourceResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => Ok(None),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ResourceError::parse(path, "required file is missing"))
        }
        Err(err) => Err(ResourceError::io(path, err)),
    }
}

/// Return the sorted list of ids for every immediate subdirectory of `root`
/// that contains `entry_filename` (the flat, one-level directory layout:
/// `root/{id}/entry_filename`).
pub fn discover_flat(root: &Path, entry_filename: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return ids;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.starts_with('_') || name == "backup" {
            continue;
        }
        if path.join(entry_filename).is_file() {
            ids.push(name);
        }
    }

    ids.sort();
    ids.dedup();
    ids
}

/// Return the sorted list of ids found one level beneath each group
/// directory under `root`: `root/{group}/{id}/entry_filename`. Groups
/// themselves are never ids; only their children are.
pub fn discover_nested(root: &Path, entry_filename: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let Ok(groups) = std::fs::read_dir(root) else {
        return ids;
    };

    for group in groups.flatten() {
        let group_path = group.path();
        if !group_path.is_dir() {
            continue;
        }
        let group_name = group.file_name().to_string_lossy().to_string();
        if group_name.starts_with('.') || group_name.starts_with('_') || group_name == "backup" {
            continue;
        }

        let Ok(children) = std::fs::read_dir(&group_path) else {
            continue;
        };
        for child in children.flatten() {
            let child_path = child.path();
            if !child_path.is_dir() {
                continue;
            }
            if child_path.join(entry_filename).is_file() {
                ids.push(child.file_name().to_string_lossy().to_string());
            }
        }
    }

    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize)]
    struct Gate {
        name: String,
    }

    #[test]
    fn load_yaml_file_missing_optional_is_none() {
        let dir = TempDir::new().unwrap();
        let result: Option<Gate> = load_yaml_file(&dir.path().join("missing.yaml"), false).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_yaml_file_missing_required_errors() {
        let dir = TempDir::new().unwrap();
        let result: ResourceResult<Option<Gate>> =
            load_yaml_file(&dir.path().join("missing.yaml"), true);
        assert!(result.is_err());
    }

    #[test]
    fn load_yaml_file_parse_error_always_surfaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "name: [unterminated").unwrap();
        let result: ResourceResult<Option<Gate>> = load_yaml_file(&path, false);
        assert!(result.is_err());
    }

    #[test]
    fn discover_flat_is_sorted_and_skips_dotted_and_backup() {
        let dir = TempDir::new().unwrap();
        for id in ["zeta", "alpha", ".hidden", "_private", "backup"] {
            let p = dir.path().join(id);
            std::fs::create_dir_all(&p).unwrap();
            std::fs::write(p.join("gate.yaml"), "name: x\n").unwrap();
        }
        let ids = discover_flat(dir.path(), "gate.yaml");
        assert_eq!(ids, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn discover_nested_scans_one_level_under_each_group() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("workflow/pre-flight-completion");
        std::fs::create_dir_all(&p).unwrap();
        std::fs::write(p.join("gate.yaml"), "name: x\n").unwrap();

        let ids = discover_nested(dir.path(), "gate.yaml");
        assert_eq!(ids, vec!["pre-flight-completion".to_string()]);
    }
}
