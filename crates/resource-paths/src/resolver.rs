use std::path::{Path, PathBuf};

use resource_core::ResourceType;

/// Resolves the ordered list of resource-root directories for a resource
/// type: `[primary_root, overlay_root_1, ...]`. Primary wins on conflicts.
///
/// The resolver is pure path arithmetic plus lightweight on-disk existence
/// checks; it never parses or validates a resource, so it can sit at the
/// bottom of the dependency graph (leaves-first: `resource-paths` has no
/// dependency on the loaders or registries built on top of it).
#[derive(Debug, Clone)]
pub struct PathResolver {
    package_manifest_dir: PathBuf,
    binary_dir: Option<PathBuf>,
    workspace_overlays: Vec<PathBuf>,
}

impl PathResolver {
    /// Build a resolver rooted at `package_manifest_dir` (the directory
    /// containing the host process's `Cargo.toml`/package manifest) with
    /// the given workspace-local overlay directories, tried in order after
    /// the primary root.
    pub fn new(package_manifest_dir: impl Into<PathBuf>, workspace_overlays: Vec<PathBuf>) -> Self {
        Self {
            package_manifest_dir: package_manifest_dir.into(),
            binary_dir: std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf)),
            workspace_overlays,
        }
    }

    /// Resolve the ordered root list for `resource_type`.
    pub fn resolve(&self, resource_type: ResourceType) -> Vec<PathBuf> {
        let primary = self.resolve_primary(resource_type);

        let mut roots = Vec::new();
        if let Some(primary) = primary {
            roots.push(primary);
        }
        for overlay in &self.workspace_overlays {
            if overlay.is_dir() && !roots.contains(overlay) {
                roots.push(overlay.clone());
            }
        }
        roots
    }

    fn resolve_primary(&self, resource_type: ResourceType) -> Option<PathBuf> {
        // 1. Environment override.
        if let Ok(configured) = std::env::var(resource_type.env_var()) {
            if !configured.trim().is_empty() {
                let path = PathBuf::from(configured);
                if has_any_entry(&path, resource_type) {
                    return Some(path);
                }
                tracing::warn!(
                    path = %path.display(),
                    env = resource_type.env_var(),
                    "environment override points at a directory with no valid entries; ignoring"
                );
            }
        }

        // 2. Walk upward from the package manifest, testing the modern
        //    `resources/{type_plural}` layout then the legacy
        //    `{type_plural}` layout at each ancestor.
        for ancestor in self.package_manifest_dir.ancestors() {
            let modern = ancestor.join("resources").join(resource_type.plural());
            if has_any_entry(&modern, resource_type) {
                return Some(modern);
            }
            let legacy = ancestor.join(resource_type.plural());
            if has_any_entry(&legacy, resource_type) {
                return Some(legacy);
            }
        }

        // 3. Fixed relative path next to the binary.
        if let Some(binary_dir) = &self.binary_dir {
            let fallback = binary_dir.join("resources").join(resource_type.plural());
            if has_any_entry(&fallback, resource_type) {
                return Some(fallback);
            }
        }

        None
    }
}

/// Whether `dir` looks like it contains at least one valid-shaped entry of
/// `resource_type` — not schema validation (that's §4.2's job), just enough
/// structure to decide this is the right root.
fn has_any_entry(dir: &Path, resource_type: ResourceType) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if name.starts_with('.') || name.starts_with('_') || name == "backup" {
            continue;
        }

        if path.is_dir() {
            if path.join(resource_type.entry_filename()).is_file() {
                return true;
            }
            // Nested/grouped overlay: `{root}/{group}/{id}/entry.yaml`.
            if let Ok(children) = std::fs::read_dir(&path) {
                for child in children.flatten() {
                    if child.path().join(resource_type.entry_filename()).is_file() {
                        return true;
                    }
                }
            }
        } else if path.is_file() {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if ext == "yaml" || ext == "yml" {
                    if name == "category.yaml" {
                        continue;
                    }
                    return true;
                }
            }
            if resource_type == ResourceType::Prompt && name == "promptsConfig.json" {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn resolves_modern_layout_over_legacy() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/gates/code-quality/gate.yaml"),
            "name: Code Quality\n",
        );
        write(
            &root.path().join("gates/legacy-gate/gate.yaml"),
            "name: Legacy\n",
        );

        let resolver = PathResolver::new(root.path(), Vec::new());
        let roots = resolver.resolve(ResourceType::Gate);
        assert_eq!(roots, vec![root.path().join("resources/gates")]);
    }

    #[test]
    fn falls_back_to_legacy_layout_when_modern_is_absent() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("gates/legacy-gate/gate.yaml"),
            "name: Legacy\n",
        );

        let resolver = PathResolver::new(root.path(), Vec::new());
        let roots = resolver.resolve(ResourceType::Gate);
        assert_eq!(roots, vec![root.path().join("gates")]);
    }

    #[test]
    fn env_override_wins_when_populated() {
        let root = TempDir::new().unwrap();
        let overridden = root.path().join("custom-gates");
        write(&overridden.join("g/gate.yaml"), "name: G\n");
        std::env::set_var("RESOURCES_GATES_PATH", &overridden);

        let resolver = PathResolver::new(root.path(), Vec::new());
        let roots = resolver.resolve(ResourceType::Gate);

        std::env::remove_var("RESOURCES_GATES_PATH");
        assert_eq!(roots, vec![overridden]);
    }

    #[test]
    fn overlays_are_deduplicated_and_appended_after_primary() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/gates/code-quality/gate.yaml"),
            "name: Code Quality\n",
        );
        let overlay = root.path().join("overlay");
        std::fs::create_dir_all(&overlay).unwrap();

        let resolver =
            PathResolver::new(root.path(), vec![overlay.clone(), overlay.clone()]);
        let roots = resolver.resolve(ResourceType::Gate);
        assert_eq!(
            roots,
            vec![root.path().join("resources/gates"), overlay]
        );
    }
}
