//! Source scanner
//!
//! Walks the repository, reads candidate files and runs each through the parser
//! backend chain in parallel. Per-file failures are logged and skipped.

use crate::config::GraphConfig;
use crate::core::{FileParseError, Language, Node, ScanEvent, SourceFile};
use crate::fs::{WalkConfig, relative_path, walk_directory_with_config};
use crate::utils::backends::BackendChain;
use crate::utils::integrations::cache::{CacheEntry, ParseCache};
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Notify helper for optional sender
pub(crate) fn notify(tx: &Option<Sender<ScanEvent>>, event: ScanEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}

/// Cancellation flag plus optional deadline shared with scan workers
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once cancelled or past the deadline; no new files are started after that.
    pub fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Per-scan counters carried into graph metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_unvisited: usize,
    pub languages: BTreeSet<String>,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub nodes: Vec<Node>,
    pub summary: ScanSummary,
}

enum FileOutcome {
    Parsed(Language, Vec<Node>),
    Skipped(PathBuf, String),
    Unvisited,
}

/// Discover candidate source files under the configured root.
///
/// Returns the canonical root and the sorted list of files with a known language.
pub fn discover_files(
    config: &GraphConfig,
    tx: &Option<Sender<ScanEvent>>,
) -> Result<(PathBuf, Vec<PathBuf>)> {
    notify(tx, ScanEvent::StartScanning);

    let root_path = config
        .path
        .canonicalize()
        .with_context(|| format!("Failed to find directory: {:?}", config.path))?;

    let walk_config = WalkConfig {
        ignore_patterns: &config.ignore_patterns,
        include_patterns: &config.include_patterns,
        max_depth: config.max_depth,
    };
    // our own graph and cache files are never inputs
    let generated: Vec<PathBuf> = std::iter::once(&config.output)
        .chain(config.cache.as_ref())
        .filter_map(|p| p.canonicalize().ok())
        .collect();
    let files: Vec<PathBuf> = walk_directory_with_config(&root_path, walk_config)?
        .into_iter()
        .filter(|p| Language::from_path(p).is_some() && !generated.contains(p))
        .collect();

    notify(tx, ScanEvent::FilesFound(files.len()));
    Ok((root_path, files))
}

/// Reads a candidate file, keeping at most `max_bytes`.
pub fn read_source(path: &Path, root: &Path, max_bytes: u64) -> Result<SourceFile, FileParseError> {
    let relative = relative_path(path, root);
    let read_err = |source| FileParseError::Read {
        path: path.to_path_buf(),
        source,
    };
    let language = Language::from_path(path).ok_or_else(|| FileParseError::Grammar {
        language: relative.clone(),
    })?;

    let file = File::open(path).map_err(read_err)?;
    let size = file.metadata().map_err(read_err)?.len();
    let mut bytes = Vec::new();
    file.take(max_bytes).read_to_end(&mut bytes).map_err(read_err)?;

    Ok(SourceFile {
        path: path.to_path_buf(),
        relative,
        language,
        content: String::from_utf8_lossy(&bytes).into_owned(),
        truncated_from: (size > max_bytes).then_some(size),
    })
}

/// Scans every candidate file into nodes.
///
/// Files run in parallel; results are merged in path order so repeated scans of an
/// unchanged tree produce the same node sequence. Duplicate ids keep their first node.
pub fn scan_repository(
    config: &GraphConfig,
    chain: &BackendChain,
    cache: Option<&ParseCache>,
    control: &ScanControl,
    tx: &Option<Sender<ScanEvent>>,
) -> Result<ScanOutcome> {
    let (root, files) = discover_files(config, tx)?;
    let fingerprint = config.parse_fingerprint();

    let scan_one = |path: &PathBuf| -> FileOutcome {
        if control.is_stopped() {
            return FileOutcome::Unvisited;
        }
        let source = match read_source(path, &root, config.max_file_size) {
            Ok(source) => source,
            Err(e) => return FileOutcome::Skipped(path.clone(), e.to_string()),
        };

        let hash = cache.map(|_| ParseCache::compute_hash(&source, &fingerprint));
        if let (Some(cache), Some(hash)) = (cache, &hash)
            && let Some(nodes) = cache.get(&source.relative, hash)
        {
            notify(tx, ScanEvent::FileProcessed(path.clone()));
            return FileOutcome::Parsed(source.language, nodes);
        }

        match chain.parse_file(&source) {
            Ok(nodes) => {
                if let (Some(cache), Some(hash)) = (cache, hash) {
                    cache.update(
                        source.relative.clone(),
                        CacheEntry {
                            hash,
                            nodes: nodes.clone(),
                        },
                    );
                }
                notify(tx, ScanEvent::FileProcessed(path.clone()));
                FileOutcome::Parsed(source.language, nodes)
            }
            Err(e) => FileOutcome::Skipped(path.clone(), e.to_string()),
        }
    };

    let outcomes: Vec<FileOutcome> = match config.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Failed to build scan thread pool")?
            .install(|| files.par_iter().map(scan_one).collect()),
        None => files.par_iter().map(scan_one).collect(),
    };

    let mut outcome = ScanOutcome::default();
    let mut seen = HashSet::new();
    for result in outcomes {
        match result {
            FileOutcome::Parsed(language, nodes) => {
                outcome.summary.files_processed += 1;
                outcome.summary.languages.insert(language.as_str().to_string());
                for node in nodes {
                    if seen.insert(node.id.clone()) {
                        outcome.nodes.push(node);
                    } else {
                        log::debug!("Duplicate node id {} dropped", node.id);
                    }
                }
            }
            FileOutcome::Skipped(path, reason) => {
                log::warn!("Skipping {}: {}", path.display(), reason);
                outcome.summary.files_skipped += 1;
                notify(tx, ScanEvent::FileSkipped(path, reason));
            }
            FileOutcome::Unvisited => outcome.summary.files_unvisited += 1,
        }
    }

    if outcome.summary.files_unvisited > 0 {
        outcome.summary.cancelled = true;
        log::warn!(
            "Scan stopped early; {} files not visited",
            outcome.summary.files_unvisited
        );
        notify(tx, ScanEvent::Cancelled(outcome.summary.files_unvisited));
    }

    if let Some(cache) = cache {
        let live: HashSet<String> = files.iter().map(|p| relative_path(p, &root)).collect();
        cache.retain_paths(&live);
    }

    log::info!(
        "Scanned {} files ({} skipped) into {} nodes",
        outcome.summary.files_processed,
        outcome.summary.files_skipped,
        outcome.nodes.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> GraphConfig {
        GraphConfig {
            path: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_scan_skips_malformed_and_unknown_files() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::write(root.join("good.py"), "def ok():\n    return 1\n")?;
        fs::write(root.join("bad.py"), "def broken(:\n    pass\n")?;
        fs::write(root.join("README"), "no extension")?;
        fs::write(root.join("notes.txt"), "plain text")?;

        let config = config_for(root);
        let outcome = scan_repository(
            &config,
            &BackendChain::default(),
            None,
            &ScanControl::new(),
            &None,
        )?;

        let ids: Vec<&str> = outcome.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["function:ok:good.py:1"]);
        assert_eq!(outcome.summary.files_processed, 1);
        assert_eq!(outcome.summary.files_skipped, 1);
        assert!(!outcome.summary.cancelled);
        Ok(())
    }

    #[test]
    fn test_cancelled_scan_visits_no_files() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("a.go"), "package a\n\nfunc A() {}\n")?;

        let control = ScanControl::new();
        control.cancel();
        let outcome = scan_repository(
            &config_for(dir.path()),
            &BackendChain::default(),
            None,
            &control,
            &None,
        )?;
        assert!(outcome.nodes.is_empty());
        assert!(outcome.summary.cancelled);
        assert_eq!(outcome.summary.files_unvisited, 1);
        Ok(())
    }

    #[test]
    fn test_size_cap_truncates() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("big.rs");
        fs::write(&path, "fn big() {}\n".repeat(100))?;

        let source = read_source(&path, dir.path(), 64)?;
        assert_eq!(source.content.len(), 64);
        assert_eq!(source.truncated_from, Some(1200));
        assert_eq!(source.relative, "big.rs");
        Ok(())
    }

    #[test]
    fn test_cache_reused_on_rescan() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("m.rs"), "fn one() {}\nfn two() { one() }\n")?;
        let config = config_for(dir.path());
        let cache = ParseCache::default();
        let chain = BackendChain::default();

        let first = scan_repository(&config, &chain, Some(&cache), &ScanControl::new(), &None)?;
        assert_eq!(cache.len(), 1);
        let second = scan_repository(&config, &chain, Some(&cache), &ScanControl::new(), &None)?;
        assert_eq!(first.nodes, second.nodes);
        Ok(())
    }
}
