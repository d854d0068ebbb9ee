mod gate;
mod methodology;
mod prompt;
mod script_tool;
mod style;

pub use gate::GateLoader;
pub use methodology::MethodologyLoader;
pub use prompt::PromptLoader;
pub use script_tool::ScriptToolLoader;
pub use style::StyleLoader;

use std::collections::BTreeMap;
use std::path::PathBuf;

use resource_core::{Resource, ResourceType, SourceRoot};
use resource_paths::PathResolver;

use crate::cache::LoaderStats;

/// Common shape every per-type loader implements.
///
/// A loader owns exactly one [`ResourceType`]'s cache and resolved roots.
/// The registry (§4.4) is the only consumer that talks to loaders directly;
/// everything above the registry works in terms of qualified keys.
pub trait ResourceLoader: Send + Sync {
    /// The type this loader serves.
    fn resource_type(&self) -> ResourceType;

    /// Every id discoverable across this loader's resolved roots, sorted
    /// and deduplicated (primary root's id wins the position, overlay ids
    /// are folded in).
    fn discover(&self) -> Vec<String>;

    /// Load one id, consulting the cache first. `Ok(None)` means the id
    /// does not exist anywhere in the resolved roots; a structural or
    /// schema problem is always an `Err`, never folded into `None`.
    fn load(&self, id: &str) -> resource_core::ResourceResult<Option<Resource>>;

    /// Whether `id` exists without paying for a full parse when already
    /// cached.
    fn exists(&self, id: &str) -> bool {
        self.load(id).ok().flatten().is_some()
    }

    /// Load every discoverable id, skipping (and logging) ids that fail to
    /// load rather than aborting the whole sweep.
    fn load_all(&self) -> BTreeMap<String, Resource> {
        let mut loaded = BTreeMap::new();
        for id in self.discover() {
            match self.load(&id) {
                Ok(Some(resource)) => {
                    loaded.insert(id, resource);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(id, error = %err, "skipping resource that failed to load");
                }
            }
        }
        loaded
    }

    /// Invalidate one cached entry, or the whole cache when `id` is `None`.
    fn clear_cache(&self, id: Option<&str>);

    /// Hit/miss/error counters for this loader's cache.
    fn stats(&self) -> LoaderStats;

    /// Directories the hot-reload observer should watch on this loader's
    /// behalf.
    fn watch_dirs(&self) -> Vec<PathBuf>;
}

/// Find the on-disk directory backing `id` across `roots`, trying the flat
/// layout (`root/{id}/{entry_filename}`) and then the one-level grouped
/// layout (`root/{group}/{id}/{entry_filename}`) at each root in order.
///
/// Primary wins: the first root (index 0) that contains `id` is used, and
/// search stops there — an overlay is never consulted once the primary (or
/// an earlier overlay) already supplied the id.
pub(crate) fn resolve_entry_dir(
    roots: &[PathBuf],
    id: &str,
    entry_filename: &str,
) -> Option<(PathBuf, SourceRoot)> {
    for (index, root) in roots.iter().enumerate() {
        let source_root = if index == 0 {
            SourceRoot::Primary
        } else {
            SourceRoot::Overlay(root.display().to_string())
        };

        let flat = root.join(id);
        if flat.join(entry_filename).is_file() {
            return Some((flat, source_root.clone()));
        }

        // Grouped layout: id may be `{group}/{name}` or a bare name that
        // lives one level under some group directory.
        if let Some((group, name)) = id.split_once('/') {
            let nested = root.join(group).join(name);
            if nested.join(entry_filename).is_file() {
                return Some((nested, source_root));
            }
            continue;
        }

        let Ok(groups) = std::fs::read_dir(root) else {
            continue;
        };
        for group in groups.flatten() {
            let group_path = group.path();
            if !group_path.is_dir() {
                continue;
            }
            let candidate = group_path.join(id);
            if candidate.join(entry_filename).is_file() {
                return Some((candidate, source_root));
            }
        }
    }

    None
}

/// Resolve a loader's roots once at construction time and cache them; the
/// hot-reload manager is responsible for telling a loader to re-resolve
/// (currently: loaders re-resolve on every `discover()`/`load()` call since
/// root resolution is cheap path arithmetic, not a filesystem sweep).
pub(crate) fn resolved_roots(resolver: &PathResolver, resource_type: ResourceType) -> Vec<PathBuf> {
    resolver.resolve(resource_type)
}

pub(crate) fn all_ids_across_roots(roots: &[PathBuf], entry_filename: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for root in roots {
        ids.extend(resource_paths::discover_flat(root, entry_filename));
        ids.extend(resource_paths::discover_nested(root, entry_filename));
    }
    ids.sort();
    ids.dedup();
    ids
}
