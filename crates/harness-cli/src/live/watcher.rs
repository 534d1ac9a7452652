//! Recursive file watching for live restarts.
//!
//! Changes under the working directory are filtered (ignore list, hidden
//! paths), debounced and forwarded to the [`ChangeBus`].

use super::ChangeBus;
use crate::error::{CliError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Directories that never trigger a restart.
pub const DEFAULT_IGNORES: &[&str] = &["node_modules", "target", "bower_components", "*.log"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Created(p) | FileChange::Modified(p) | FileChange::Removed(p) => p,
        }
    }

    fn from_event(kind: &EventKind, path: &Path) -> Option<Self> {
        let path = path.to_path_buf();
        match kind {
            EventKind::Create(_) => Some(FileChange::Created(path)),
            EventKind::Modify(_) => Some(FileChange::Modified(path)),
            EventKind::Remove(_) => Some(FileChange::Removed(path)),
            _ => None,
        }
    }
}

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub root: PathBuf,
    /// Extra patterns: `name` ignores a directory anywhere, `*.ext` a suffix.
    pub ignore: Vec<String>,
    /// Repeated changes to one path closer together than this collapse into one.
    pub debounce: Duration,
}

impl WatchOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore: DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect(),
            debounce: Duration::from_millis(100),
        }
    }

    pub fn ignore(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.ignore.extend(patterns);
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Recursive watcher over the working directory.
///
/// Dropping the watcher stops event delivery.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Start watching. Accepted changes arrive on the returned receiver.
    pub fn start(options: WatchOptions) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !options.root.is_dir() {
            return Err(CliError::FileNotFound(options.root));
        }

        let (tx, rx) = mpsc::channel(64);
        let root = options.root.clone();
        let ignore = options.ignore.clone();
        let mut debouncer = Debouncer::new(options.debounce);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("file watcher error: {e}");
                    return;
                }
            };

            let now = Instant::now();
            for path in &event.paths {
                if should_ignore(path, &root, &ignore) || !debouncer.accept(path, now) {
                    continue;
                }
                let Some(change) = FileChange::from_event(&event.kind, path) else {
                    continue;
                };
                // A full queue already holds a pending restart.
                let _ = tx.try_send(change);
            }
        })?;

        watcher.watch(&options.root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %options.root.display(), "watching for changes");

        Ok((Self { _watcher: watcher }, rx))
    }
}

/// Per-path debounce: repeated events for one file within the window collapse,
/// changes to different files always pass.
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::new(),
        }
    }

    fn accept(&mut self, path: &Path, now: Instant) -> bool {
        let window = self.window;
        self.last_seen
            .retain(|_, at| now.saturating_duration_since(*at) < window);

        if self.last_seen.contains_key(path) {
            return false;
        }
        self.last_seen.insert(path.to_path_buf(), now);
        true
    }
}

/// Publish one [`ChangeEvent`](super::ChangeEvent) per accepted change until
/// the watcher is dropped.
pub async fn pump_changes(mut changes: mpsc::Receiver<FileChange>, bus: ChangeBus) {
    while let Some(change) = changes.recv().await {
        tracing::info!(path = %change.path().display(), "file changed");
        bus.publish();
    }
}

fn should_ignore(path: &Path, root: &Path, patterns: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };

    let names: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    if names.iter().any(|name| name.starts_with('.')) {
        return true;
    }

    patterns.iter().any(|pattern| match pattern.strip_prefix('*') {
        Some(suffix) => names.last().is_some_and(|file| file.ends_with(suffix)),
        None => names.iter().any(|name| name == pattern),
    })
}
