use dashmap::DashMap;
use parking_lot::Mutex;
use resource_core::Resource;

/// Hit/miss/error counters for a loader's cache, exposed via
/// [`crate::loader::ResourceLoader::stats`] for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Cache hits since the loader was constructed (or last reset).
    pub hits: u64,
    /// Cache misses that required a disk read.
    pub misses: u64,
    /// Loads that failed (not-found is not an error; see [`Resource`]'s
    /// error taxonomy).
    pub errors: u64,
}

/// Writer-private cache a loader keeps between the process's resolved
/// roots and its consumers. The hot-reload manager is the only external
/// channel that can invalidate it (via [`ResourceCache::clear`]).
#[derive(Default)]
pub struct ResourceCache {
    entries: DashMap<String, Resource>,
    stats: Mutex<LoaderStats>,
}

impl ResourceCache {
    /// A fresh, empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            stats: Mutex::new(LoaderStats::default()),
        }
    }

    /// Look up a normalized id, recording a hit or miss.
    pub fn get(&self, id: &str) -> Option<Resource> {
        match self.entries.get(id) {
            Some(entry) => {
                self.stats.lock().hits += 1;
                Some(entry.clone())
            }
            None => {
                self.stats.lock().misses += 1;
                None
            }
        }
    }

    /// Peek without affecting hit/miss counters (used by `exists`).
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert a fully-validated resource. Never called with a partial
    /// entry — a failed load never reaches this point.
    pub fn insert(&self, id: String, resource: Resource) {
        self.entries.insert(id, resource);
    }

    /// Drop one entry, or every entry when `id` is `None`.
    pub fn clear(&self, id: Option<&str>) {
        match id {
            Some(id) => {
                self.entries.remove(id);
            }
            None => self.entries.clear(),
        }
    }

    /// Record a failed load (parse/schema/io error, never not-found).
    pub fn record_error(&self) {
        self.stats.lock().errors += 1;
    }

    /// Snapshot the current counters.
    pub fn stats(&self) -> LoaderStats {
        *self.stats.lock()
    }

    /// All cached entries, keyed by normalized id.
    pub fn snapshot(&self) -> std::collections::BTreeMap<String, Resource> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
