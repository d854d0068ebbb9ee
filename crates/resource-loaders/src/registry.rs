use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use resource_core::{Resource, ResourceType};

use crate::loader::ResourceLoader;

/// Filters accepted by [`ResourceRegistry::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only resources in this category (prompts only).
    pub category: Option<String>,
    /// Only resources whose `enabled` flag matches.
    pub enabled: Option<bool>,
}

/// Thin, read-mostly overlay around a loader's discovered resources.
///
/// Consumers obtain [`Arc<Resource>`] snapshots that are immutable once
/// observed — the registry is the only writer, and every mutation replaces
/// a whole map entry rather than editing one in place, so a reader never
/// sees a half-updated [`Resource`].
pub struct ResourceRegistry {
    resource_type: ResourceType,
    entries: RwLock<HashMap<String, Arc<Resource>>>,
}

impl ResourceRegistry {
    /// Build an empty registry for `resource_type`. Call [`Self::populate`]
    /// to fill it from a loader at startup.
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The resource type this registry serves.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Fill the registry from a loader: `discover()` + per-id `load()`,
    /// primary-root ids populate first, overlay ids are added only when
    /// the key is still absent (§4.5 overlay precedence — `load()` already
    /// resolves primary-over-overlay per id, so no additional merge step
    /// is required here beyond "first write wins" on duplicate discovery).
    pub fn populate(&self, loader: &dyn ResourceLoader) {
        let mut map = HashMap::new();
        for id in loader.discover() {
            match loader.load(&id) {
                Ok(Some(resource)) => {
                    let key = resource.qualified_key();
                    map.entry(key).or_insert_with(|| Arc::new(resource));
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(id, error = %err, "skipping resource during registry populate");
                }
            }
        }
        *self.entries.write() = map;
    }

    /// Snapshot lookup by qualified key.
    pub fn get(&self, key: &str) -> Option<Arc<Resource>> {
        self.entries.read().get(key).cloned()
    }

    /// Filtered snapshot of every entry, sorted by qualified key for
    /// deterministic iteration.
    pub fn list(&self, filter: &ListFilter) -> Vec<Arc<Resource>> {
        let mut matches: Vec<Arc<Resource>> = self
            .entries
            .read()
            .values()
            .filter(|resource| match &filter.category {
                Some(category) => resource.category.as_deref() == Some(category.as_str()),
                None => true,
            })
            .filter(|resource| match filter.enabled {
                Some(enabled) => resource.enabled == enabled,
                None => true,
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.qualified_key().cmp(&b.qualified_key()));
        matches
    }

    /// Replace (or insert) one entry. Used only by the hot-reload handler.
    pub fn replace(&self, key: String, resource: Resource) {
        self.entries.write().insert(key, Arc::new(resource));
    }

    /// Remove one entry. Used on deletion events.
    pub fn remove(&self, key: &str) -> Option<Arc<Resource>> {
        self.entries.write().remove(key)
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::GateLoader;
    use resource_paths::PathResolver;
    use tempfile::TempDir;

    fn write(path: &std::path::Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn populate_fills_registry_from_loader() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/gates/code-quality/gate.yaml"),
            "id: code-quality\nname: Code Quality\ntype: validation\nseverity: error\ndescription: d\n",
        );
        let loader = GateLoader::new(PathResolver::new(root.path(), Vec::new()));

        let registry = ResourceRegistry::new(ResourceType::Gate);
        registry.populate(&loader);

        assert_eq!(registry.len(), 1);
        assert!(registry.get("gate:code-quality").is_some());
    }

    #[test]
    fn replace_and_remove_mutate_the_snapshot_map() {
        let registry = ResourceRegistry::new(ResourceType::Gate);
        let resource = Resource {
            id: "code-quality".to_string(),
            category: None,
            source_paths: Vec::new(),
            source_hash: "abc".to_string(),
            payload: resource_core::Payload::Gate(resource_core::GatePayload {
                name: "Code Quality".to_string(),
                gate_type: resource_core::GateType::Validation,
                severity: resource_core::GateSeverity::Error,
                description: String::new(),
                guidance: None,
                pass_criteria: Vec::new(),
                retry_policy: None,
                scope: None,
                expires_at: None,
            }),
            enabled: true,
            register_with_protocol: resource_core::RegisterPolicy::default(),
            source_root: resource_core::SourceRoot::Primary,
        };

        registry.replace("gate:code-quality".to_string(), resource);
        assert_eq!(registry.len(), 1);
        registry.remove("gate:code-quality");
        assert!(registry.is_empty());
    }
}
