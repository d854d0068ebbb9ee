use std::path::PathBuf;

use resource_core::{Payload, Resource, ResourceError, ResourceResult, ResourceType, StylePayload};
use resource_paths::PathResolver;

use crate::cache::{LoaderStats, ResourceCache};

use super::{all_ids_across_roots, resolve_entry_dir, resolved_roots, ResourceLoader};

/// Loads styles from `{root}/{id}/style.yaml` (+ optional sibling
/// `guidance.md`, inlined as `guidance`).
pub struct StyleLoader {
    resolver: PathResolver,
    cache: ResourceCache,
}

impl StyleLoader {
    /// Build a loader around an already-constructed [`PathResolver`].
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            cache: ResourceCache::new(),
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        resolved_roots(&self.resolver, ResourceType::Style)
    }

    fn load_from_disk(&self, id: &str) -> ResourceResult<Option<Resource>> {
        let roots = self.roots();
        let Some((dir, source_root)) = resolve_entry_dir(&roots, id, "style.yaml") else {
            return Ok(None);
        };

        let entry_path = dir.join("style.yaml");
        let entry_text = std::fs::read_to_string(&entry_path)
            .map_err(|err| ResourceError::io(&entry_path, err))?;
        let mut value: serde_json::Value = serde_yml::from_str(&entry_text)
            .map_err(|err| ResourceError::parse(&entry_path, err.to_string()))?;

        let guidance_path = dir.join("guidance.md");
        let guidance = resource_paths::load_text_file(&guidance_path, false)?;
        if let (Some(guidance), Some(map)) = (&guidance, value.as_object_mut()) {
            map.insert("guidance".to_string(), serde_json::Value::String(guidance.clone()));
        }

        let outcome = resource_schema::validate_style(&value, id);
        if !outcome.valid {
            return Err(ResourceError::schema(&entry_path, outcome.errors));
        }

        let payload: StylePayload = serde_json::from_value(value)
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
            payload: Payload::Style(payload),
            enabled: true,
            register_with_protocol: resource_core::RegisterPolicy::default(),
            source_root,
        }))
    }
}

impl ResourceLoader for StyleLoader {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Style
    }

    fn discover(&self) -> Vec<String> {
        all_ids_across_roots(&self.roots(), "style.yaml")
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &std::path::Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_style_with_guidance() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/styles/concise/style.yaml"),
            "id: concise\npriority: 10\nenhancementMode: prepend\n",
        );
        write(
            &root.path().join("resources/styles/concise/guidance.md"),
            "Be terse.\n",
        );

        let loader = StyleLoader::new(PathResolver::new(root.path(), Vec::new()));
        let resource = loader.load("concise").unwrap().unwrap();
        let Payload::Style(payload) = resource.payload else {
            panic!("expected style payload");
        };
        assert_eq!(payload.guidance, "Be terse.\n");
        assert_eq!(payload.priority, 10);
    }
}
