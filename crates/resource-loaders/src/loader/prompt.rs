use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use resource_core::{
    Payload, PromptPayload, RegisterPolicy, Resource, ResourceError, ResourceResult, ResourceType,
    SourceRoot,
};
use resource_paths::PathResolver;

use crate::cache::{LoaderStats, ResourceCache};
use crate::config::LoaderConfig;

use super::{resolved_roots, ResourceLoader, ScriptToolLoader};

/// Imported prompt descriptor from the legacy `promptsConfig.json` registry.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPromptDescriptor {
    id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(flatten)]
    body: serde_json::Value,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct LegacyImport {
    #[serde(default)]
    prompts: Vec<LegacyPromptDescriptor>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPromptsConfig {
    #[serde(default)]
    imports: Vec<LegacyImport>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryMeta {
    #[serde(default)]
    register_with_protocol: Option<bool>,
}

/// Loads prompts, the only resource type with three on-disk layouts:
/// directory (`{category}/{id}/prompt.yaml`), single-file
/// (`{category}/{id}.yaml`), and a legacy JSON registry
/// (`promptsConfig.json`), gated by [`LoaderConfig::legacy_json_registry`].
pub struct PromptLoader {
    resolver: PathResolver,
    cache: ResourceCache,
    legacy_json_registry: Option<bool>,
}

impl PromptLoader {
    /// Build a loader from shared startup configuration.
    pub fn new(resolver: PathResolver, config: &LoaderConfig) -> Self {
        Self {
            resolver,
            cache: ResourceCache::new(),
            legacy_json_registry: config.legacy_json_registry,
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        resolved_roots(&self.resolver, ResourceType::Prompt)
    }

    fn legacy_registry_path(&self, root: &Path) -> Option<PathBuf> {
        let path = root.join("promptsConfig.json");
        match self.legacy_json_registry {
            Some(false) => None,
            Some(true) => Some(path),
            None => path.is_file().then_some(path),
        }
    }

    /// Every category directory directly under `root`, skipping the usual
    /// dotted/underscore/backup names.
    fn categories(root: &Path) -> Vec<String> {
        let mut categories = Vec::new();
        let Ok(entries) = std::fs::read_dir(root) else {
            return categories;
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
            categories.push(name);
        }
        categories.sort();
        categories
    }

    fn category_meta(category_dir: &Path) -> ResourceResult<CategoryMeta> {
        Ok(
            resource_paths::load_yaml_file::<CategoryMeta>(&category_dir.join("category.yaml"), false)?
                .unwrap_or_default(),
        )
    }

    fn ids_in_category(category_dir: &Path) -> Vec<String> {
        let mut ids = Vec::new();
        let Ok(entries) = std::fs::read_dir(category_dir) else {
            return ids;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || name.starts_with('_') || name == "backup" {
                continue;
            }
            if path.is_dir() {
                if path.join("prompt.yaml").is_file() {
                    ids.push(name);
                }
            } else if path.is_file() && name.ends_with(".yaml") && name != "category.yaml" {
                ids.push(name.trim_end_matches(".yaml").to_string());
            }
        }
        ids
    }

    /// Resolve a qualified id (`{category}/{id}`, matching [`Self::discover`]'s
    /// output) or a bare id (matching against every category, for callers
    /// that do not yet know which category owns it) to its on-disk location.
    ///
    /// A category qualifier is required to tell apart two categories that
    /// both define the same bare id — without it, the first category found
    /// (alphabetically) wins, same as before this distinction existed.
    fn find_in_roots(&self, qualified_id: &str) -> Option<(PathBuf, String, SourceRoot, bool)> {
        let (wanted_category, id) = match qualified_id.split_once('/') {
            Some((category, id)) => (Some(category), id),
            None => (None, qualified_id),
        };

        for (index, root) in self.roots().iter().enumerate() {
            let source_root = if index == 0 {
                SourceRoot::Primary
            } else {
                SourceRoot::Overlay(root.display().to_string())
            };
            for category in Self::categories(root) {
                if let Some(wanted) = wanted_category {
                    if category != wanted {
                        continue;
                    }
                }
                let category_dir = root.join(&category);
                let dir_layout = category_dir.join(id);
                if dir_layout.join("prompt.yaml").is_file() {
                    return Some((dir_layout, category, source_root, true));
                }
                let file_layout = category_dir.join(format!("{id}.yaml"));
                if file_layout.is_file() {
                    return Some((file_layout, category, source_root, false));
                }
            }

            if let Some(legacy_path) = self.legacy_registry_path(root) {
                if let Ok(Some(value)) =
                    resource_paths::load_json_file::<serde_json::Value>(&legacy_path, false)
                {
                    if let Some(descriptor) = find_legacy_descriptor(&value, id) {
                        let descriptor_category = descriptor.category.as_deref().unwrap_or("uncategorized");
                        let category_matches = match wanted_category {
                            Some(wanted) => wanted == descriptor_category,
                            None => true,
                        };
                        if category_matches {
                            return Some((legacy_path, String::new(), source_root, false));
                        }
                    }
                }
            }
        }
        None
    }

    fn load_directory_layout(
        &self,
        id: &str,
        dir: &Path,
        category: &str,
        source_root: SourceRoot,
    ) -> ResourceResult<Resource> {
        let entry_path = dir.join("prompt.yaml");
        let entry_text =
            std::fs::read_to_string(&entry_path).map_err(|err| ResourceError::io(&entry_path, err))?;
        let mut value: serde_json::Value = serde_yml::from_str(&entry_text)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;

        let mut sources = vec![(entry_path.clone(), entry_text)];
        let mut source_paths = vec![entry_path.clone()];

        let system_message_path = dir.join("system-message.md");
        if let Some(text) = resource_paths::load_text_file(&system_message_path, false)? {
            sources.push((system_message_path.clone(), text.clone()));
            source_paths.push(system_message_path);
            set_string_field(&mut value, "systemMessage", text);
        }

        let user_message_path = dir.join("user-message.md");
        if let Some(text) = resource_paths::load_text_file(&user_message_path, false)? {
            sources.push((user_message_path.clone(), text.clone()));
            source_paths.push(user_message_path);
            set_string_field(&mut value, "userMessage", text);
        }

        let tools_dir = dir.join("tools");
        let mut script_tool_ids = Vec::new();
        if tools_dir.is_dir() {
            let mut tool_dirs: Vec<PathBuf> = std::fs::read_dir(&tools_dir)
                .into_iter()
                .flatten()
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            tool_dirs.sort();

            for tool_dir in tool_dirs {
                let tool_id = tool_dir
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default();
                if !tool_dir.join("tool.yaml").is_file() {
                    continue;
                }
                let tool_resource =
                    ScriptToolLoader::load_from_dir(&tool_dir, &tool_id, source_root.clone())?;
                for path in &tool_resource.source_paths {
                    if let Ok(text) = std::fs::read_to_string(path) {
                        sources.push((path.clone(), text));
                    }
                }
                source_paths.extend(tool_resource.source_paths.clone());
                script_tool_ids.push(tool_id);
            }
        }
        if let Some(map) = value.as_object_mut() {
            map.insert(
                "scriptToolIds".to_string(),
                serde_json::Value::Array(
                    script_tool_ids.iter().cloned().map(serde_json::Value::String).collect(),
                ),
            );
        }

        let known_prompt_ids = resource_paths::discover_nested(
            dir.parent().and_then(Path::parent).unwrap_or(dir),
            "prompt.yaml",
        );
        let outcome = resource_schema::validate_prompt(&value, id, Some(&known_prompt_ids));
        for warning in &outcome.warnings {
            tracing::debug!(id, warning, "prompt validation warning");
        }
        if !outcome.valid {
            return Err(ResourceError::schema(&entry_path, outcome.errors));
        }

        let payload: PromptPayload = serde_json::from_value(value)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;

        self.finish_resource(id, category, source_root, payload, sources, source_paths)
    }

    fn load_single_file_layout(
        &self,
        id: &str,
        path: &Path,
        category: &str,
        source_root: SourceRoot,
    ) -> ResourceResult<Resource> {
        let text = std::fs::read_to_string(path).map_err(|err| ResourceError::io(path, err))?;
        let value: serde_json::Value =
            serde_yml::from_str(&text).map_err(|err| ResourceError::parse(path, err.to_string()))?;

        let outcome = resource_schema::validate_prompt(&value, id, None);
        if !outcome.valid {
            return Err(ResourceError::schema(path, outcome.errors));
        }

        let payload: PromptPayload =
            serde_json::from_value(value).map_err(|err| ResourceError::parse(path, err.to_string()))?;

        self.finish_resource(
            id,
            category,
            source_root,
            payload,
            vec![(path.to_path_buf(), text)],
            vec![path.to_path_buf()],
        )
    }

    fn load_legacy_entry(
        &self,
        id: &str,
        registry_path: &Path,
        source_root: SourceRoot,
    ) -> ResourceResult<Resource> {
        let text = std::fs::read_to_string(registry_path)
            .map_err(|err| ResourceError::io(registry_path, err))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|err| ResourceError::parse(registry_path, err.to_string()))?;

        let descriptor = find_legacy_descriptor(&value, id)
            .ok_or_else(|| ResourceError::NotFound(id.to_string()))?;
        let mut body = descriptor.body.clone();

        let outcome = resource_schema::validate_prompt(&body, id, None);
        if !outcome.valid {
            return Err(ResourceError::schema(registry_path, outcome.errors));
        }
        if let Some(map) = body.as_object_mut() {
            map.entry("chainSteps").or_insert_with(|| serde_json::Value::Array(Vec::new()));
        }

        let payload: PromptPayload = serde_json::from_value(body)
            .map_err(|err| ResourceError::parse(registry_path, err.to_string()))?;

        self.finish_resource(
            id,
            descriptor.category.as_deref().unwrap_or("uncategorized"),
            source_root,
            payload,
            vec![(registry_path.to_path_buf(), text)],
            vec![registry_path.to_path_buf()],
        )
    }

    fn finish_resource(
        &self,
        id: &str,
        category: &str,
        source_root: SourceRoot,
        payload: PromptPayload,
        sources: Vec<(PathBuf, String)>,
        source_paths: Vec<PathBuf>,
    ) -> ResourceResult<Resource> {
        let source_hash = resource_core::source_hash(&sources);
        Ok(Resource {
            id: id.to_string(),
            category: Some(category.to_string()),
            source_paths,
            source_hash,
            payload: Payload::Prompt(payload),
            enabled: true,
            register_with_protocol: RegisterPolicy::default(),
            source_root,
        })
    }

    fn load_from_disk(&self, qualified_id: &str) -> ResourceResult<Option<Resource>> {
        let bare_id = qualified_id.rsplit('/').next().unwrap_or(qualified_id);
        let Some((location, category, source_root, is_dir)) = self.find_in_roots(qualified_id) else {
            return Ok(None);
        };

        let resource = if category.is_empty() {
            self.load_legacy_entry(bare_id, &location, source_root)?
        } else if is_dir {
            self.load_directory_layout(bare_id, &location, &category, source_root)?
        } else {
            self.load_single_file_layout(bare_id, &location, &category, source_root)?
        };

        Ok(Some(resource))
    }
}

fn set_string_field(value: &mut serde_json::Value, field: &str, text: String) {
    if let Some(map) = value.as_object_mut() {
        map.insert(field.to_string(), serde_json::Value::String(text));
    }
}

fn find_legacy_descriptor(config: &serde_json::Value, id: &str) -> Option<LegacyPromptDescriptor> {
    let config: LegacyPromptsConfig = serde_json::from_value(config.clone()).ok()?;
    for import in config.imports {
        for descriptor in import.prompts {
            if descriptor.id == id {
                return Some(descriptor);
            }
        }
    }
    None
}

impl ResourceLoader for PromptLoader {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Prompt
    }

    /// Returns `{category}/{id}` qualified ids, never bare ids: two prompts
    /// sharing an id across different categories are distinct resources
    /// (§3 — `prompt:{category}/{id}` keys are unique per category), and a
    /// bare-id discovery list would silently collapse them to one entry.
    fn discover(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for root in self.roots() {
            for category in Self::categories(&root) {
                for id in Self::ids_in_category(&root.join(&category)) {
                    ids.push(format!("{category}/{id}"));
                }
            }
            if let Some(legacy_path) = self.legacy_registry_path(&root) {
                if let Ok(Some(value)) =
                    resource_paths::load_json_file::<serde_json::Value>(&legacy_path, false)
                {
                    if let Ok(config) =
                        serde_json::from_value::<LegacyPromptsConfig>(value)
                    {
                        for import in config.imports {
                            for descriptor in import.prompts {
                                let category = descriptor.category.as_deref().unwrap_or("uncategorized");
                                ids.push(format!("{category}/{}", descriptor.id));
                            }
                        }
                    }
                }
            }
        }
        ids.sort();
        ids.dedup();
        ids
    }

    fn load(&self, id: &str) -> ResourceResult<Option<Resource>> {
        if let Some(resource) = self.cache.get(id) {
            return Ok(Some(resource));
        }

        match self.load_from_disk(id) {
            Ok(Some(resource)) => {
                self.cache.insert(id.to_string(), resource.clone());
                Ok(Some(resource))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                self.cache.record_error();
                Err(err)
            }
        }
    }

    fn clear_cache(&self, id: Option<&str>) {
        self.cache.clear(id);
    }

    fn stats(&self) -> LoaderStats {
        self.cache.stats()
    }

    fn watch_dirs(&self) -> Vec<PathBuf> {
        self.roots()
    }
}

/// Resolve the effective `register_with_protocol` policy for a loaded
/// prompt, folding in its category's default when the resource itself
/// leaves the policy at [`RegisterPolicy::Inherit`].
pub fn resolve_register_policy(
    resource: &Resource,
    category_roots: &BTreeMap<String, PathBuf>,
) -> bool {
    match resource.register_with_protocol {
        RegisterPolicy::Explicit(value) => value,
        RegisterPolicy::Inherit => {
            let Some(category) = &resource.category else {
                return true;
            };
            let Some(category_dir) = category_roots.get(category) else {
                return true;
            };
            PromptLoader::category_meta(category_dir)
                .ok()
                .and_then(|meta| meta.register_with_protocol)
                .unwrap_or(true)
        }
    }
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
    fn loads_directory_layout_prompt_with_inlined_messages() {
        let root = TempDir::new().unwrap();
        write(
            &root
                .path()
                .join("resources/prompts/development/review/prompt.yaml"),
            "id: review\narguments: []\n",
        );
        write(
            &root
                .path()
                .join("resources/prompts/development/review/user-message.md"),
            "Review {{code}}.\n",
        );

        let loader = PromptLoader::new(
            PathResolver::new(root.path(), Vec::new()),
            &LoaderConfig::new(root.path()),
        );
        let resource = loader.load("review").unwrap().unwrap();
        assert_eq!(resource.category.as_deref(), Some("development"));
        let Payload::Prompt(payload) = resource.payload else {
            panic!("expected prompt payload");
        };
        assert_eq!(payload.user_message.as_deref(), Some("Review {{code}}.\n"));
    }

    #[test]
    fn loads_single_file_layout_prompt() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/prompts/development/quick.yaml"),
            "id: quick\nuserMessage: Do it.\narguments: []\n",
        );

        let loader = PromptLoader::new(
            PathResolver::new(root.path(), Vec::new()),
            &LoaderConfig::new(root.path()),
        );
        let resource = loader.load("quick").unwrap().unwrap();
        assert_eq!(resource.category.as_deref(), Some("development"));
    }

    #[test]
    fn loads_legacy_json_registry_entry() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/prompts/promptsConfig.json"),
            r#"{"imports":[{"prompts":[{"id":"legacy-review","category":"development","userMessage":"Review it"}]}]}"#,
        );

        let loader = PromptLoader::new(
            PathResolver::new(root.path(), Vec::new()),
            &LoaderConfig::new(root.path()).with_legacy_json_registry(true),
        );
        let resource = loader.load("legacy-review").unwrap().unwrap();
        assert_eq!(resource.category.as_deref(), Some("development"));
    }

    #[test]
    fn legacy_registry_auto_detected_when_file_exists() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/prompts/promptsConfig.json"),
            r#"{"imports":[{"prompts":[{"id":"legacy-review","category":"development","userMessage":"Review it"}]}]}"#,
        );

        let loader = PromptLoader::new(
            PathResolver::new(root.path(), Vec::new()),
            &LoaderConfig::new(root.path()),
        );
        assert!(loader.load("legacy-review").unwrap().is_some());
    }

    #[test]
    fn attached_script_tool_is_discovered_and_inlined() {
        let root = TempDir::new().unwrap();
        write(
            &root
                .path()
                .join("resources/prompts/development/review/prompt.yaml"),
            "id: review\nuserMessage: Review it\narguments: []\n",
        );
        write(
            &root
                .path()
                .join("resources/prompts/development/review/tools/linter/tool.yaml"),
            "id: linter\nruntime: python3\n",
        );
        write(
            &root
                .path()
                .join("resources/prompts/development/review/tools/linter/script.py"),
            "print('lint')\n",
        );

        let loader = PromptLoader::new(
            PathResolver::new(root.path(), Vec::new()),
            &LoaderConfig::new(root.path()),
        );
        let resource = loader.load("review").unwrap().unwrap();
        let Payload::Prompt(payload) = resource.payload else {
            panic!("expected prompt payload");
        };
        assert_eq!(payload.script_tool_ids, vec!["linter".to_string()]);
    }

    #[test]
    fn discover_qualifies_ids_by_category_so_same_id_in_two_categories_is_distinct() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/prompts/development/review/prompt.yaml"),
            "id: review\nuserMessage: Review the diff\narguments: []\n",
        );
        write(
            &root.path().join("resources/prompts/security/review/prompt.yaml"),
            "id: review\nuserMessage: Review for vulnerabilities\narguments: []\n",
        );

        let loader = PromptLoader::new(
            PathResolver::new(root.path(), Vec::new()),
            &LoaderConfig::new(root.path()),
        );

        let ids = loader.discover();
        assert_eq!(
            ids,
            vec!["development/review".to_string(), "security/review".to_string()]
        );
    }

    #[test]
    fn same_id_in_two_categories_both_load_and_populate_distinct_registry_keys() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/prompts/development/review/prompt.yaml"),
            "id: review\nuserMessage: Review the diff\narguments: []\n",
        );
        write(
            &root.path().join("resources/prompts/security/review/prompt.yaml"),
            "id: review\nuserMessage: Review for vulnerabilities\narguments: []\n",
        );

        let loader = PromptLoader::new(
            PathResolver::new(root.path(), Vec::new()),
            &LoaderConfig::new(root.path()),
        );

        let dev = loader.load("development/review").unwrap().unwrap();
        let sec = loader.load("security/review").unwrap().unwrap();
        assert_eq!(dev.qualified_key(), "prompt:development/review");
        assert_eq!(sec.qualified_key(), "prompt:security/review");

        let Payload::Prompt(dev_payload) = dev.payload else {
            panic!("expected prompt payload");
        };
        let Payload::Prompt(sec_payload) = sec.payload else {
            panic!("expected prompt payload");
        };
        assert_eq!(dev_payload.user_message.as_deref(), Some("Review the diff\n"));
        assert_eq!(sec_payload.user_message.as_deref(), Some("Review for vulnerabilities\n"));

        let registry = crate::registry::ResourceRegistry::new(ResourceType::Prompt);
        registry.populate(&loader);
        assert!(registry.get("prompt:development/review").is_some());
        assert!(registry.get("prompt:security/review").is_some());
        assert_eq!(registry.len(), 2);
    }
}
