use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant, SystemTime};

use glob::Pattern;
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Window within which repeated raw filesystem events against the same
/// path collapse into one logical [`RawEvent`] — the atomic-write
/// `.tmp`/`.bak` dance (§4.8) always produces a short burst against one
/// target path, and the observer's job is to hide that burst from every
/// downstream consumer.
const COALESCE_WINDOW: Duration = Duration::from_millis(50);

/// The kind of filesystem change a [`RawEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A new path appeared.
    Added,
    /// An existing path's contents changed.
    Modified,
    /// A path disappeared.
    Removed,
}

/// One coalesced, uninterpreted filesystem event. The observer performs no
/// interpretation of *what* the path means — that is the Hot-Reload
/// Manager's job.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// The affected path.
    pub path: PathBuf,
    /// What happened to it.
    pub operation: Operation,
    /// When the observer finished coalescing and emitted this event.
    pub timestamp: SystemTime,
}

/// Filename filters the observer restricts events to (`*.yaml`, `*.md`,
/// `prompt.yaml`, `prompts*.json`, …), compiled once via `glob::Pattern`.
#[derive(Debug, Clone)]
pub struct FilenameFilters {
    patterns: Vec<Pattern>,
}

impl FilenameFilters {
    /// Build a filter set from glob patterns (`*.ext`, `prompts*.json`, or
    /// an exact name). A pattern that fails to compile is logged and
    /// dropped rather than failing the whole set.
    pub fn new(patterns: Vec<String>) -> Self {
        let patterns = patterns
            .into_iter()
            .filter_map(|raw| match Pattern::new(&raw) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    tracing::warn!(pattern = %raw, error = %err, "invalid filename filter; ignoring");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// The default filter set every resource-subsystem watch root uses.
    pub fn default_resource_filters() -> Self {
        Self::new(
            [
                "*.yaml", "*.yml", "*.md", "prompt.yaml", "gate.yaml", "methodology.yaml",
                "style.yaml", "tool.yaml", "guidance.md", "phases.yaml", "category.yaml",
                "prompts*.json",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }

    /// Whether `path`'s filename matches one of the configured patterns.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.iter().any(|pattern| pattern.matches(name))
    }
}

/// Wraps a cross-platform filesystem watcher (`notify`) and coalesces
/// atomic-write bursts into one logical event per target path.
///
/// Pure transport: [`FileObserver`] never inspects what a path means to the
/// resource subsystem, only whether its name matches the configured
/// filters.
pub struct FileObserver {
    _watcher: RecommendedWatcher,
}

impl FileObserver {
    /// Start watching `roots` (recursively) and return the observer handle
    /// plus the channel of coalesced [`RawEvent`]s.
    ///
    /// A root that does not exist yet is silently skipped rather than
    /// failing the whole spawn — the hot-reload manager re-registers roots
    /// it expects to appear after enough of the resource tree exists.
    pub fn spawn(
        roots: Vec<PathBuf>,
        filters: FilenameFilters,
    ) -> notify::Result<(Self, mpsc::UnboundedReceiver<RawEvent>)> {
        let (raw_tx, raw_rx) = std_mpsc::channel::<NotifyEvent>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<NotifyEvent>| {
            if let Ok(event) = res {
                let _ = raw_tx.send(event);
            }
        })?;

        for root in &roots {
            if root.is_dir() {
                if let Err(err) = watcher.watch(root, RecursiveMode::Recursive) {
                    tracing::warn!(root = %root.display(), error = %err, "failed to watch root");
                }
            }
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || coalesce_loop(raw_rx, filters, out_tx));

        Ok((Self { _watcher: watcher }, out_rx))
    }
}

fn coalesce_loop(
    raw_rx: std_mpsc::Receiver<NotifyEvent>,
    filters: FilenameFilters,
    out_tx: mpsc::UnboundedSender<RawEvent>,
) {
    let mut pending: HashMap<PathBuf, (Operation, Instant)> = HashMap::new();

    loop {
        match raw_rx.recv_timeout(COALESCE_WINDOW) {
            Ok(event) => {
                for path in &event.paths {
                    if !filters.matches(path) {
                        continue;
                    }
                    let Some(operation) = classify_notify_kind(&event.kind) else {
                        continue;
                    };
                    pending.insert(path.clone(), (operation, Instant::now()));
                }
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        let ready: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, (_, seen))| now.duration_since(*seen) >= COALESCE_WINDOW)
            .map(|(path, _)| path.clone())
            .collect();

        for path in ready {
            if let Some((operation, _)) = pending.remove(&path) {
                let raw = RawEvent {
                    path,
                    operation,
                    timestamp: SystemTime::now(),
                };
                if out_tx.send(raw).is_err() {
                    return;
                }
            }
        }
    }
}

fn classify_notify_kind(kind: &EventKind) -> Option<Operation> {
    match kind {
        EventKind::Create(_) => Some(Operation::Added),
        EventKind::Modify(_) => Some(Operation::Modified),
        EventKind::Remove(_) => Some(Operation::Removed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_glob_matches_suffix() {
        let filters = FilenameFilters::new(vec!["*.yaml".to_string()]);
        assert!(filters.matches(Path::new("/resources/gates/code-quality/gate.yaml")));
        assert!(!filters.matches(Path::new("/resources/gates/code-quality/guidance.md")));
    }

    #[test]
    fn exact_name_pattern_matches_only_that_name() {
        let filters = FilenameFilters::new(vec!["category.yaml".to_string()]);
        assert!(filters.matches(Path::new("/resources/prompts/dev/category.yaml")));
        assert!(!filters.matches(Path::new("/resources/prompts/dev/review/prompt.yaml")));
    }

    #[test]
    fn default_filters_cover_every_entry_and_auxiliary_file() {
        let filters = FilenameFilters::default_resource_filters();
        for name in ["prompt.yaml", "gate.yaml", "guidance.md", "phases.yaml", "prompts-config.json"] {
            assert!(filters.matches(Path::new(name)), "{name} should match");
        }
    }
}
