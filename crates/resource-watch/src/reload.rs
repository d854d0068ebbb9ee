use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use resource_core::ResourceType;
use resource_loaders::{ResourceLoader, ResourceRegistry};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::observer::{Operation, RawEvent};

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);
const HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a [`ReloadEvent`] was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// A single resource's own files changed.
    Resource,
    /// The legacy prompts JSON registry changed; every prompt must be
    /// re-evaluated.
    ConfigChanged,
    /// A `category.yaml` changed; affects the category's default policy.
    CategoryChanged,
}

/// A classified, debounced reload instruction handed to a
/// [`ReloadHandler`].
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    /// Resource type affected.
    pub resource_type: ResourceType,
    /// Resource id (or category name, for [`ChangeType::CategoryChanged`]).
    pub id: String,
    /// Category the id belongs to, when known (prompts only).
    pub category: Option<String>,
    /// The raw operation that triggered this event.
    pub reason: Operation,
    /// Every file observed to change as part of this debounced event.
    pub affected_files: Vec<PathBuf>,
    /// What kind of change this is.
    pub change_type: ChangeType,
    /// When the manager dispatched the event.
    pub timestamp: SystemTime,
    /// Whether the handler must treat this as "reload everything of this
    /// type" rather than a single id.
    pub requires_full_reload: bool,
}

/// Receives dispatched [`ReloadEvent`]s. Implementations must never panic
/// across this boundary — log and return instead.
#[async_trait::async_trait]
pub trait ReloadHandler: Send + Sync {
    /// Apply one reload event. Step order (§4.7): clear cache, then
    /// load+replace (added/modified) or remove (removed), or a full
    /// cache-clear + re-populate for config/category changes.
    async fn handle(&self, event: ReloadEvent);
}

/// The default [`ReloadHandler`]: drives a loader + registry pair through
/// the four-step contract.
pub struct LoaderReloadHandler {
    loader: Arc<dyn ResourceLoader>,
    registry: Arc<ResourceRegistry>,
}

impl LoaderReloadHandler {
    /// Build a handler around the loader/registry pair it reloads.
    pub fn new(loader: Arc<dyn ResourceLoader>, registry: Arc<ResourceRegistry>) -> Self {
        Self { loader, registry }
    }
}

#[async_trait::async_trait]
impl ReloadHandler for LoaderReloadHandler {
    async fn handle(&self, event: ReloadEvent) {
        let loader = Arc::clone(&self.loader);
        let registry = Arc::clone(&self.registry);
        let result = tokio::task::spawn_blocking(move || apply_reload(&*loader, &registry, &event)).await;
        if let Err(join_err) = result {
            tracing::error!(error = %join_err, "reload handler task panicked");
        }
    }
}

fn apply_reload(loader: &dyn ResourceLoader, registry: &ResourceRegistry, event: &ReloadEvent) {
    if event.requires_full_reload {
        loader.clear_cache(None);
        registry.populate(loader);
        tracing::info!(
            resource_type = %event.resource_type,
            reason = ?event.change_type,
            "performed full reload"
        );
        return;
    }

    // Prompts are discovered and cached under `{category}/{id}` (two
    // categories may share a bare id), so the loader id used for cache
    // invalidation and reload must carry the category too.
    let loader_id = match (event.resource_type, &event.category) {
        (ResourceType::Prompt, Some(category)) => format!("{category}/{}", event.id),
        _ => event.id.clone(),
    };

    loader.clear_cache(Some(&loader_id));

    match event.reason {
        Operation::Removed => {
            let key = resource_core::qualified_key(event.resource_type, event.category.as_deref(), &event.id);
            registry.remove(&key);
            tracing::info!(id = %event.id, "resource removed from registry");
        }
        Operation::Added | Operation::Modified => match loader.load(&loader_id) {
            Ok(Some(resource)) => {
                let key = resource.qualified_key();
                registry.replace(key, resource);
            }
            Ok(None) => {
                tracing::debug!(id = %event.id, "reload found no resource on disk; leaving registry unchanged");
            }
            Err(err) => {
                tracing::warn!(id = %event.id, error = %err, "failed to reload resource");
            }
        },
    }
}

/// One watched resource type's directories and handler.
pub struct Registration {
    /// Resource type this registration reloads.
    pub resource_type: ResourceType,
    /// Directories the observer watches on this registration's behalf.
    pub directories: Vec<PathBuf>,
    /// Handler invoked on dispatch.
    pub handler: Arc<dyn ReloadHandler>,
}

type ReloadKey = (ResourceType, String);

/// Coordinates debounced, cancellation-aware reload dispatch across every
/// registered resource type.
pub struct HotReloadManager {
    registrations: Vec<Registration>,
    inflight: Mutex<HashMap<ReloadKey, (u64, CancellationToken)>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_generation: AtomicU64,
}

impl HotReloadManager {
    /// Build a manager from its type registrations.
    pub fn new(registrations: Vec<Registration>) -> Arc<Self> {
        Arc::new(Self {
            registrations,
            inflight: Mutex::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            next_generation: AtomicU64::new(0),
        })
    }

    /// Directories across every registration, for handing to
    /// [`crate::observer::FileObserver::spawn`].
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        self.registrations
            .iter()
            .flat_map(|registration| registration.directories.iter().cloned())
            .collect()
    }

    /// Drive the manager from a stream of [`RawEvent`]s until the channel
    /// closes.
    pub async fn run(self: &Arc<Self>, mut events: mpsc::UnboundedReceiver<RawEvent>) {
        while let Some(raw) = events.recv().await {
            if let Some(classified) = self.classify(&raw) {
                self.dispatch(classified);
            } else {
                tracing::debug!(path = %raw.path.display(), "ignoring unclassified filesystem event");
            }
        }
    }

    fn registration_for(&self, resource_type: ResourceType) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|registration| registration.resource_type == resource_type)
    }

    fn classify(&self, raw: &RawEvent) -> Option<ReloadEvent> {
        let file_name = raw.path.file_name()?.to_str()?;

        if file_name == "promptsConfig.json" || is_legacy_prompts_json(file_name) {
            if self.registration_for(ResourceType::Prompt).is_some() {
                return Some(ReloadEvent {
                    resource_type: ResourceType::Prompt,
                    id: "promptsConfig".to_string(),
                    category: None,
                    reason: raw.operation,
                    affected_files: vec![raw.path.clone()],
                    change_type: ChangeType::ConfigChanged,
                    timestamp: raw.timestamp,
                    requires_full_reload: true,
                });
            }
            return None;
        }

        if file_name == "category.yaml" {
            let category = raw.path.parent()?.file_name()?.to_str()?.to_string();
            if self.registration_for(ResourceType::Prompt).is_some() {
                return Some(ReloadEvent {
                    resource_type: ResourceType::Prompt,
                    id: category,
                    category: None,
                    reason: raw.operation,
                    affected_files: vec![raw.path.clone()],
                    change_type: ChangeType::CategoryChanged,
                    timestamp: raw.timestamp,
                    requires_full_reload: true,
                });
            }
            return None;
        }

        for resource_type in [
            ResourceType::Prompt,
            ResourceType::Gate,
            ResourceType::Methodology,
            ResourceType::Style,
            ResourceType::ScriptTool,
        ] {
            if !is_owned_file(file_name, resource_type) {
                continue;
            }
            let registration = self.registration_for(resource_type)?;
            let dir = raw.path.parent()?;
            let (id, category) = resolve_id_for_dir(dir, &registration.directories)?;
            return Some(ReloadEvent {
                resource_type,
                id,
                category,
                reason: raw.operation,
                affected_files: vec![raw.path.clone()],
                change_type: ChangeType::Resource,
                timestamp: raw.timestamp,
                requires_full_reload: false,
            });
        }

        None
    }

    fn dispatch(self: &Arc<Self>, event: ReloadEvent) {
        let key = (event.resource_type, event.id.clone());
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        {
            let mut inflight = self.inflight.lock();
            if let Some((_, previous)) = inflight.insert(key.clone(), (generation, cancel.clone())) {
                previous.cancel();
            }
        }

        let manager = Arc::clone(self);
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            manager.debounce_and_handle(key, event, generation, task_cancel).await;
        });
        self.tasks.lock().push(handle);
    }

    async fn debounce_and_handle(
        self: Arc<Self>,
        key: ReloadKey,
        event: ReloadEvent,
        generation: u64,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(?key, "reload superseded before debounce window elapsed");
                return;
            }
            _ = tokio::time::sleep(DEBOUNCE_WINDOW) => {}
        }

        {
            let mut inflight = self.inflight.lock();
            if matches!(inflight.get(&key), Some((current_generation, _)) if *current_generation == generation) {
                inflight.remove(&key);
            }
        }

        let Some(registration) = self.registration_for(event.resource_type) else {
            return;
        };

        let handler = Arc::clone(&registration.handler);
        let handle_future = handler.handle(event.clone());
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(?key, "in-flight reload handler cancelled by newer event");
            }
            result = tokio::time::timeout(HANDLER_TIMEOUT, handle_future) => {
                if result.is_err() {
                    tracing::warn!(?key, "reload handler exceeded its deadline; abandoning");
                }
            }
        }
    }

    /// Wait for every currently-dispatched reload to finish (debounce +
    /// handler execution), for tests and orderly shutdown.
    pub async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        futures::future::join_all(handles).await;
    }
}

fn is_legacy_prompts_json(file_name: &str) -> bool {
    file_name.starts_with("prompts") && file_name.ends_with(".json")
}

fn is_owned_file(file_name: &str, resource_type: ResourceType) -> bool {
    if file_name == resource_type.entry_filename() {
        return true;
    }
    matches!(
        (resource_type, file_name),
        (ResourceType::Gate, "guidance.md")
            | (ResourceType::Style, "guidance.md")
            | (ResourceType::Methodology, "phases.yaml")
            | (ResourceType::Methodology, "system-prompt.md")
            | (ResourceType::Prompt, "system-message.md")
            | (ResourceType::Prompt, "user-message.md")
    )
}

/// Resolve `dir` (the parent directory of a changed file) to a resource id
/// relative to one of `roots`: one path component beneath a root is the
/// flat-layout id, two components is the grouped/category layout
/// `{group}/{id}` (the first component doubling as the category for
/// prompts).
fn resolve_id_for_dir(dir: &Path, roots: &[PathBuf]) -> Option<(String, Option<String>)> {
    for root in roots {
        let Ok(rel) = dir.strip_prefix(root) else {
            continue;
        };
        let components: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        return match components.len() {
            1 => Some((components[0].clone(), None)),
            2 => Some((components[1].clone(), Some(components[0].clone()))),
            _ => None,
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_loaders::LoaderStats;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ReloadHandler for CountingHandler {
        async fn handle(&self, _event: ReloadEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn resolves_flat_layout_id_directly_under_root() {
        let root = PathBuf::from("/resources/gates");
        let dir = root.join("code-quality");
        let (id, category) = resolve_id_for_dir(&dir, &[root]).unwrap();
        assert_eq!(id, "code-quality");
        assert!(category.is_none());
    }

    #[test]
    fn resolves_grouped_layout_id_one_level_down() {
        let root = PathBuf::from("/resources/prompts");
        let dir = root.join("development").join("review");
        let (id, category) = resolve_id_for_dir(&dir, &[root]).unwrap();
        assert_eq!(id, "review");
        assert_eq!(category.as_deref(), Some("development"));
    }

    #[tokio::test]
    async fn debounced_events_for_the_same_key_collapse_into_one_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("resources/gates/code-quality/gate.yaml"),
            "id: code-quality\nname: x\ntype: validation\nseverity: error\ndescription: d\n",
        );
        let manager = HotReloadManager::new(vec![Registration {
            resource_type: ResourceType::Gate,
            directories: vec![root.path().join("resources/gates")],
            handler: Arc::new(CountingHandler { calls: Arc::clone(&calls) }),
        }]);

        let gate_dir = root.path().join("resources/gates");
        for _ in 0..3 {
            let event = manager
                .classify(&RawEvent {
                    path: gate_dir.join("code-quality/gate.yaml"),
                    operation: Operation::Modified,
                    timestamp: SystemTime::now(),
                })
                .unwrap();
            manager.dispatch(event);
        }

        manager.drain().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stats_helper_type_is_reexported() {
        let _: Option<LoaderStats> = None;
    }
}
