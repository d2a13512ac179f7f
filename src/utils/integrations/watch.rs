//! Watch mode for continuous graph rebuilds
//!
//! Monitors the repository root and reports changes to candidate source files.

use crate::config::GraphConfig;
use crate::core::Language;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, unbounded};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Watch event for file changes
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Modified(PathBuf),
    Created(PathBuf),
    Deleted(PathBuf),
    Error(String),
}

impl WatchEvent {
    pub fn path(&self) -> Option<&Path> {
        match self {
            WatchEvent::Modified(p) | WatchEvent::Created(p) | WatchEvent::Deleted(p) => Some(p),
            WatchEvent::Error(_) => None,
        }
    }
}

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<WatchEvent>,
}

impl FileWatcher {
    /// Create a recursive watcher for the given path
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = unbounded();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    for path in event.paths {
                        let watch_event = match event.kind {
                            notify::EventKind::Modify(_) => WatchEvent::Modified(path),
                            notify::EventKind::Create(_) => WatchEvent::Created(path),
                            notify::EventKind::Remove(_) => WatchEvent::Deleted(path),
                            _ => continue,
                        };
                        let _ = tx.send(watch_event);
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            },
            Config::default(),
        )
        .context("Failed to create watcher")?;

        watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {:?}", path))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Next event, waiting at most `timeout`
    pub fn next_event(&self, timeout: Duration) -> Option<WatchEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// All queued events (non-blocking)
    pub fn pending_events(&self) -> Vec<WatchEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Debounce file events to avoid back-to-back rebuilds
pub struct Debouncer {
    last_events: HashMap<PathBuf, Instant>,
    delay: Duration,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            last_events: HashMap::new(),
            delay,
        }
    }

    /// False while `path` fired within the last `delay`.
    pub fn should_process(&mut self, path: &Path) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_events.get(path)
            && now.duration_since(*last) < self.delay
        {
            return false;
        }
        self.last_events.insert(path.to_path_buf(), now);
        true
    }

    pub fn cleanup(&mut self) {
        let now = Instant::now();
        self.last_events
            .retain(|_, last| now.duration_since(*last) < self.delay * 10);
    }
}

/// Decides which changed paths warrant a rebuild
pub struct ChangeFilter {
    /// Files the pipeline writes itself
    excluded: HashSet<PathBuf>,
    /// Ignore patterns that name a plain directory or file
    ignored_names: HashSet<String>,
}

impl ChangeFilter {
    pub fn new(config: &GraphConfig) -> Self {
        let mut excluded = HashSet::new();
        for path in std::iter::once(&config.output).chain(config.cache.as_ref()) {
            excluded.insert(std::path::absolute(path).unwrap_or_else(|_| path.clone()));
        }
        let ignored_names = config
            .ignore_patterns
            .iter()
            .filter(|p| !p.contains(['*', '?', '[', '/']))
            .cloned()
            .collect();
        Self {
            excluded,
            ignored_names,
        }
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        if Language::from_path(path).is_none() || self.excluded.contains(path) {
            return false;
        }
        !path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| self.ignored_names.contains(name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debouncer() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let path = Path::new("test.rs");

        assert!(debouncer.should_process(path));
        assert!(!debouncer.should_process(path));
        assert!(debouncer.should_process(Path::new("other.rs")));

        std::thread::sleep(Duration::from_millis(150));
        assert!(debouncer.should_process(path));
    }

    #[test]
    fn test_change_filter() -> Result<()> {
        let config = GraphConfig {
            output: std::path::absolute("out/graph.json")?,
            ..Default::default()
        };
        let filter = ChangeFilter::new(&config);

        assert!(filter.is_relevant(Path::new("/repo/src/lib.rs")));
        assert!(!filter.is_relevant(Path::new("/repo/notes.txt")));
        assert!(!filter.is_relevant(Path::new("/repo/node_modules/x/index.js")));
        assert!(!filter.is_relevant(&config.output));
        Ok(())
    }
}
