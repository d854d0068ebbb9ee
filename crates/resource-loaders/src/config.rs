use std::path::PathBuf;

/// Startup configuration for the loader fleet.
///
/// Built once by the process entry point and handed to every loader it
/// constructs — no module-level singleton, no global lazy-init. Tests build
/// an alternative `LoaderConfig` pointing at a temp directory instead of
/// touching global state.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory containing the host package's manifest; the Path Resolver
    /// walks upward from here.
    pub package_manifest_dir: PathBuf,
    /// Additional workspace-local overlay directories, tried in order
    /// after the resolved primary root.
    pub workspace_overlays: Vec<PathBuf>,
    /// Whether the legacy `promptsConfig.json`-driven registry should be
    /// consulted for prompts. `None` means auto-detect: enabled only when
    /// a `promptsConfig.json` actually exists at the prompts root.
    pub legacy_json_registry: Option<bool>,
}

impl LoaderConfig {
    /// Build a config rooted at `package_manifest_dir` with no overlays and
    /// auto-detected legacy-registry behaviour.
    pub fn new(package_manifest_dir: impl Into<PathBuf>) -> Self {
        Self {
            package_manifest_dir: package_manifest_dir.into(),
            workspace_overlays: Vec::new(),
            legacy_json_registry: None,
        }
    }

    /// Add a workspace overlay directory.
    #[must_use]
    pub fn with_overlay(mut self, overlay: impl Into<PathBuf>) -> Self {
        self.workspace_overlays.push(overlay.into());
        self
    }

    /// Force the legacy JSON prompt registry on or off rather than
    /// auto-detecting it.
    #[must_use]
    pub fn with_legacy_json_registry(mut self, enabled: bool) -> Self {
        self.legacy_json_registry = Some(enabled);
        self
    }
}
