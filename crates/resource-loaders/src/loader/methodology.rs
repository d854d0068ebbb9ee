use std::path::PathBuf;

use resource_core::{MethodologyPayload, Payload, Resource, ResourceError, ResourceResult, ResourceType};
use resource_paths::PathResolver;

use crate::cache::{LoaderStats, ResourceCache};

use super::{all_ids_across_roots, resolve_entry_dir, resolved_roots, ResourceLoader};

/// Loads methodologies from `{root}/{id}/methodology.yaml`, with optional
/// sibling `phases.yaml` (overriding/extending the inline `phases` list) and
/// `system-prompt.md` (inlined as `systemPrompt` when present).
pub struct MethodologyLoader {
    resolver: PathResolver,
    cache: ResourceCache,
}

impl MethodologyLoader {
    /// Build a loader around an already-constructed [`PathResolver`].
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            cache: ResourceCache::new(),
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        resolved_roots(&self.resolver, ResourceType::Methodology)
    }

    fn load_from_disk(&self, id: &str) -> ResourceResult<Option<Resource>> {
        let roots = self.roots();
        let Some((dir, source_root)) = resolve_entry_dir(&roots, id, "methodology.yaml") else {
            return Ok(None);
        };

        let entry_path = dir.join("methodology.yaml");
        let entry_text = std::fs::read_to_string(&entry_path)
            .map_err(|err| ResourceError::io(&entry_path, err))?;
        let mut value: serde_json::Value = serde_yml::from_str(&entry_text)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;

        let mut sources = vec![(entry_path.clone(), entry_text)];
        let mut source_paths = vec![entry_path.clone()];

        let phases_path = dir.join("phases.yaml");
        if let Some(phases_value) =
            resource_paths::load_yaml_file::<serde_json::Value>(&phases_path, false)?
        {
            let phases_text = std::fs::read_to_string(&phases_path)
                .map_err(|err| ResourceError::io(&phases_path, err))?;
            sources.push((phases_path.clone(), phases_text));
            source_paths.push(phases_path);
            if let Some(map) = value.as_object_mut() {
                map.insert("phases".to_string(), phases_value);
            }
        }

        let system_prompt_path = dir.join("system-prompt.md");
        if let Some(system_prompt) = resource_paths::load_text_file(&system_prompt_path, false)? {
            sources.push((system_prompt_path.clone(), system_prompt.clone()));
            source_paths.push(system_prompt_path);
            if let Some(map) = value.as_object_mut() {
                map.insert("systemPrompt".to_string(), serde_json::Value::String(system_prompt));
            }
        }

        let outcome = resource_schema::validate_methodology(&value, id);
        for warning in &outcome.warnings {
            tracing::debug!(id, warning, "methodology validation warning");
        }
        if !outcome.valid {
            return Err(ResourceError::schema(&entry_path, outcome.errors));
        }

        let payload: MethodologyPayload = serde_json::from_value(value)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;

        let source_hash = resource_core::source_hash(&sources);

        Ok(Some(Resource {
            id: id.to_string(),
            category: None,
            source_paths,
            source_hash,
            payload: Payload::Methodology(payload),
            enabled: true,
            register_with_protocol: resource_core::RegisterPolicy::default(),
            source_root,
        }))
    }
}

impl ResourceLoader for MethodologyLoader {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Methodology
    }

    fn discover(&self) -> Vec<String> {
        all_ids_across_roots(&self.roots(), "methodology.yaml")
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
