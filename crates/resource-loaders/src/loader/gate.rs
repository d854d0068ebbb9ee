use std::path::PathBuf;

use resource_core::{GatePayload, Payload, Resource, ResourceError, ResourceResult, ResourceType};
use resource_paths::PathResolver;

use crate::cache::{LoaderStats, ResourceCache};

use super::{all_ids_across_roots, resolve_entry_dir, resolved_roots, ResourceLoader};

/// Loads gates from `{root}/{id}/gate.yaml` (+ optional sibling
/// `guidance.md`), across the primary root and any overlays.
pub struct GateLoader {
    resolver: PathResolver,
    cache: ResourceCache,
}

impl GateLoader {
    /// Build a loader around an already-constructed [`PathResolver`].
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            cache: ResourceCache::new(),
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        resolved_roots(&self.resolver, ResourceType::Gate)
    }

    fn load_from_disk(&self, id: &str) -> ResourceResult<Option<Resource>> {
        let roots = self.roots();
        let Some((dir, source_root)) = resolve_entry_dir(&roots, id, "gate.yaml") else {
            return Ok(None);
        };

        let entry_path = dir.join("gate.yaml");
        let entry_text = std::fs::read_to_string(&entry_path)
            .map_err(|err| ResourceError::io(&entry_path, err))?;
        let mut value: serde_json::Value = serde_yml::from_str(&entry_text)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;

        let outcome = resource_schema::validate_gate(&value, id);
        for warning in &outcome.warnings {
            tracing::debug!(id, warning, "gate validation warning");
        }
        if !outcome.valid {
            return Err(ResourceError::schema(&entry_path, outcome.errors));
        }

        let guidance_path = dir.join("guidance.md");
        let guidance = resource_paths::load_text_file(&guidance_path, false)?;
        if let (Some(guidance), Some(map)) = (&guidance, value.as_object_mut()) {
            map.insert("guidance".to_string(), serde_json::Value::String(guidance.clone()));
        }

        let payload: GatePayload = serde_json::from_value(value)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;

        let mut sources = vec![(entry_path.clone(), entry_text)];
        let mut source_paths = vec![entry_path];
        if let Some(guidance_text) = &guidance {
            sources.push((guidance_path.clone(), guidance_text.clone()));
            source_paths.push(guidance_path);
        }
        let source_hash = resource_core::source_hash(&sources);

        Ok(Some(Resource {
            id: id.to_string(),
            category: None,
            source_paths,
            source_hash,
            payload: Payload::Gate(payload),
            enabled: true,
            register_with_protocol: resource_core::RegisterPolicy::default(),
            source_root,
        }))
    }
}

impl ResourceLoader for GateLoader {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Gate
    }

    fn discover(&self) -> Vec<String> {
        all_ids_across_roots(&self.roots(), "gate.yaml")
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
